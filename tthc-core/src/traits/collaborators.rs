//! The three model-backed collaborators consumed by the core: the
//! embedder, the analysis LLM, and the cross-encoder reranker. Real
//! implementations (HTTP-backed or in-process) live in `tthc-providers`;
//! this crate only names the contract.

use anyhow::Result;
use async_trait::async_trait;

use crate::intent::Intent;

/// Produces a dense embedding for a piece of text. The same model must be
/// used for indexing and query time; changing it invalidates the vector
/// store.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single piece of text.
    ///
    /// # Errors
    ///
    /// Returns an error on provider failure or timeout.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality this embedder produces (1024 per the spec).
    fn dimensions(&self) -> usize;
}

/// Query analysis: intent classification and paraphrase generation,
/// delegated to an LLM.
#[async_trait]
pub trait LlmAnalyzer: Send + Sync {
    /// Classify the intent of a question.
    ///
    /// # Errors
    ///
    /// Returns an error on provider failure, timeout, or a response that
    /// can't be parsed into one of the eight intents. Callers are expected
    /// to fall back to `Intent::Overview` with confidence 0 on error.
    async fn classify_intent(&self, question: &str) -> Result<(Intent, f32)>;

    /// Generate up to `n` paraphrases of `question`.
    ///
    /// # Errors
    ///
    /// Returns an error on provider failure or timeout.
    async fn paraphrase(&self, question: &str, n: usize) -> Result<Vec<String>>;
}

/// Cross-encoder relevance scoring for (query, candidate) pairs.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score each of `texts` against `query`. Returns one score per input
    /// text, in [0, 1], in the same order as `texts`.
    ///
    /// # Errors
    ///
    /// Returns an error on provider failure or timeout.
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
}
