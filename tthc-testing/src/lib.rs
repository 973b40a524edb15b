//! Deterministic fixtures shared by integration tests across the
//! workspace: a small sample procedure corpus plus a builder that wires a
//! chunk store, lexical index and vector store together the same way the
//! CLI binary does at startup.

pub mod fixtures;

pub use fixtures::{sample_corpus, FixtureWorld};
