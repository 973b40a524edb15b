//! Adapters for the three external collaborators the retrieval core consumes:
//! an embedder, an LLM used only for query analysis, and a cross-encoder
//! reranker. Each has a deterministic `mock` implementation for tests and
//! offline fixtures, and an `http` implementation that speaks to a real
//! service over `reqwest`.

pub mod config;
pub mod http;
pub mod mock;

pub use config::ProviderConfig;
