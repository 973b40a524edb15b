//! The final, cacheable result of a `retrieve()` call.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::types::plan::QueryPlan;

/// One chunk retained in the final, assembled context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Id of the underlying chunk, so generated output can be cited back to it.
    pub chunk_id: String,
    /// Procedure the chunk belongs to.
    pub procedure_id: String,
    /// Text as it appears in the assembled context (post-truncation).
    pub content: String,
    /// Final reranked score.
    pub score: f32,
}

/// Side information about how a result was produced, useful for the
/// generator and for a host HTTP layer's debug surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalMetadata {
    /// True if some retrieval channel failed but the pipeline still returned a result.
    pub degraded: bool,
    /// Set when both dense and lexical channels failed.
    pub no_channels: bool,
    /// True if Stage 2 (exact procedure code) fired, bypassing Stages 3-7.
    pub exact_code_fast_path: bool,
    /// True if this result was served from the semantic cache.
    pub cache_hit: bool,
    /// Wall-clock time spent in `retrieve()`, in milliseconds.
    pub elapsed_ms: u64,
}

/// The output of `retrieve(session_id, question)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Ranked, deduplicated, assembled chunks.
    pub chunks: Vec<RetrievedChunk>,
    /// Concatenated context block with stable section delimiters.
    pub context_text: String,
    /// Mean reranked score of retained chunks, clamped to [0, 1], scaled by
    /// 0.9 when `metadata.degraded`.
    pub confidence: f32,
    /// Intent the query plan resolved to.
    pub intent: Intent,
    /// The plan this result was produced from.
    pub plan: QueryPlan,
    /// Degraded/cache/fast-path bookkeeping.
    pub metadata: RetrievalMetadata,
}

impl RetrievalResult {
    /// Build the empty result for the `NoChannels` failure path:
    /// `confidence = 0`, no chunks, no context text.
    #[must_use]
    pub fn no_channels(plan: QueryPlan) -> Self {
        let intent = plan.intent;
        Self {
            chunks: Vec::new(),
            context_text: String::new(),
            confidence: 0.0,
            intent,
            plan,
            metadata: RetrievalMetadata {
                no_channels: true,
                ..RetrievalMetadata::default()
            },
        }
    }
}
