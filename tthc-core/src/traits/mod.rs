//! Collaborator trait definitions.
//!
//! `ChunkStore` and `LexicalIndex` are implemented by `tthc-storage` as
//! process-wide, read-only singletons. `VectorStore`, `Embedder`,
//! `LlmAnalyzer` and `Reranker` are implemented by `tthc-providers`, with
//! both a deterministic mock and an HTTP-backed adapter per trait.

mod collaborators;
mod store;
mod vector;

pub use collaborators::{Embedder, LlmAnalyzer, Reranker};
pub use store::{ChunkStore, LexicalIndex, LexicalStats};
pub use vector::{VectorFilter, VectorStore};
