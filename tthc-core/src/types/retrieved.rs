//! The retrieved item: a transient, per-request candidate as it flows
//! through dense retrieval, lexical augmentation, fusion and reranking.

use serde::{Deserialize, Serialize};

/// Which stage a retrieved item's current score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Produced by the vector store.
    Dense,
    /// Produced by BM25.
    Lexical,
    /// Produced by reciprocal rank fusion across dense + lexical.
    Fused,
    /// Re-scored by the cross-encoder ensemble.
    Reranked,
}

/// A candidate chunk, carried through the pipeline with its current score
/// and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    /// The chunk this item refers to.
    pub chunk_id: String,
    /// Current score; its meaning depends on `source` (raw dense/BM25
    /// similarity, RRF score, or ensemble score).
    pub score: f32,
    /// Which stage most recently set `score`.
    pub source: Source,
    /// Best (lowest) rank this chunk held within any single source ranked
    /// list, 1-based. `None` before the item has appeared in any ranking.
    pub rank_per_source: Option<usize>,
    /// Whether this chunk's procedure also appeared among the Stage-3
    /// parent hits for the same query.
    pub cross_tier_match: bool,
}

impl RetrievedItem {
    /// Construct a fresh item from a single-source hit.
    #[must_use]
    pub fn new(chunk_id: impl Into<String>, score: f32, source: Source, rank: usize) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            score,
            source,
            rank_per_source: Some(rank),
            cross_tier_match: false,
        }
    }
}
