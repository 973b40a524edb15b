//! ABOUTME: Core domain types, error kinds and collaborator traits for the retrieval core
//! ABOUTME: Foundation layer shared by storage, providers, and the retrieval orchestrator

pub mod error;
pub mod intent;
pub mod traits;
pub mod types;

pub mod prelude {
    //! Convenient re-exports for downstream crates.

    pub use crate::error::{RetrievalError, Result};
    pub use crate::intent::{chunk_type_filter, context_config, Intent};
    pub use crate::traits::{ChunkStore, Embedder, LexicalIndex, LlmAnalyzer, Reranker, VectorStore};
    pub use crate::types::chunk::{Chunk, ChunkType, Tier};
    pub use crate::types::plan::{ContextConfig, QueryPlan};
    pub use crate::types::result::{RetrievalMetadata, RetrievalResult, RetrievedChunk};
    pub use crate::types::retrieved::{RetrievedItem, Source};
}
