//! The retrieval orchestrator: nine pipeline stages, wired together behind
//! a single `retrieve(session_id, question)` entry point. Every stage is
//! implemented as its own module so it can be unit-tested in isolation;
//! `orchestrator` is the only module that sequences them.

pub mod analyser;
pub mod assembler;
pub mod cache;
pub mod ensemble;
pub mod orchestrator;
pub mod rrf;

pub use analyser::QueryAnalyser;
pub use assembler::ContextAssembler;
pub use cache::SemanticCache;
pub use ensemble::{EnsembleReranker, RerankCandidate};
pub use orchestrator::RetrievalOrchestrator;
