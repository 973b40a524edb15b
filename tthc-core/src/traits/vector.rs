//! Vector store adapter trait: k-nearest-neighbour search with server-side
//! metadata filtering over precomputed embeddings.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::chunk::{ChunkType, Tier};

/// Conjunction over metadata fields. `None` on a field means "no restriction
/// on that field". All present fields must match for a candidate to survive
/// a *hard* filter; Stage 4's soft cross-tier restriction applies
/// `procedure_id` as a scoring penalty instead of a hard filter, and so
/// leaves it out of this struct (see `RetrievalFlow` in `tthc-retrieval`).
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Restrict to a tier.
    pub tier: Option<Tier>,
    /// Restrict to a set of chunk types.
    pub chunk_type: Option<HashSet<ChunkType>>,
    /// Restrict to a set of procedure ids.
    pub procedure_id: Option<HashSet<String>>,
}

impl VectorFilter {
    /// Filter on tier alone.
    #[must_use]
    pub fn tier(tier: Tier) -> Self {
        Self {
            tier: Some(tier),
            ..Self::default()
        }
    }

    /// Filter on tier plus a chunk-type set.
    #[must_use]
    pub fn tier_and_types(tier: Tier, types: impl IntoIterator<Item = ChunkType>) -> Self {
        Self {
            tier: Some(tier),
            chunk_type: Some(types.into_iter().collect()),
            procedure_id: None,
        }
    }

    /// Filter on a single procedure id (used by Stage 2's exact-code fast path).
    #[must_use]
    pub fn procedure(procedure_id: impl Into<String>) -> Self {
        let mut set = HashSet::new();
        set.insert(procedure_id.into());
        Self {
            tier: None,
            chunk_type: None,
            procedure_id: Some(set),
        }
    }
}

/// K-nearest-neighbour search over precomputed embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimensionality this store was built for (1024 per the spec).
    fn dimensions(&self) -> usize;

    /// Search for the `k` nearest neighbours of `query_vector`, optionally
    /// restricted by `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the query vector's
    /// dimensionality doesn't match.
    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<(String, f32)>>;
}
