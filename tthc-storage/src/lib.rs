//! Chunk store, BM25 lexical index, and an in-process vector store adapter.
//!
//! All three are constructed once at startup and handed to the orchestrator
//! as read-only singletons (`tthc-core`'s ownership model, §3/§9 of the spec).

pub mod chunk_store;
pub mod lexical;
pub mod vector;

pub use chunk_store::JsonChunkStore;
pub use lexical::Bm25Index;
pub use vector::InMemoryVectorStore;
