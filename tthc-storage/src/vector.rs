//! Brute-force in-process vector store.
//!
//! Holds one precomputed embedding per chunk and answers k-NN queries by
//! scanning every candidate and scoring cosine similarity. Fine at the
//! corpus sizes this system targets (thousands of chunks); a production
//! deployment would swap this for an ANN index behind the same trait.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tthc_core::traits::{VectorFilter, VectorStore};
use tthc_core::types::chunk::{ChunkType, Tier};

#[derive(Clone)]
struct Entry {
    embedding: Vec<f32>,
    tier: Tier,
    chunk_type: ChunkType,
    procedure_id: String,
}

/// In-memory, brute-force vector store keyed by chunk id.
#[derive(Clone)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    entries: HashMap<String, Entry>,
}

impl InMemoryVectorStore {
    /// Create an empty store for embeddings of the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: HashMap::new(),
        }
    }

    /// Insert or replace a chunk's embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if `embedding.len()` doesn't match `dimensions()`.
    pub fn upsert(
        &mut self,
        chunk_id: impl Into<String>,
        embedding: Vec<f32>,
        tier: Tier,
        chunk_type: ChunkType,
        procedure_id: impl Into<String>,
    ) -> Result<()> {
        if embedding.len() != self.dimensions {
            bail!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimensions
            );
        }
        self.entries.insert(
            chunk_id.into(),
            Entry {
                embedding,
                tier,
                chunk_type,
                procedure_id: procedure_id.into(),
            },
        );
        Ok(())
    }

    fn passes(entry: &Entry, filter: &VectorFilter) -> bool {
        if let Some(tier) = filter.tier {
            if entry.tier != tier {
                return false;
            }
        }
        if let Some(types) = &filter.chunk_type {
            if !types.contains(&entry.chunk_type) {
                return false;
            }
        }
        if let Some(procedures) = &filter.procedure_id {
            if !procedures.contains(&entry.procedure_id) {
                return false;
            }
        }
        true
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<(String, f32)>> {
        if query_vector.len() != self.dimensions {
            bail!(
                "query vector has {} dimensions, store expects {}",
                query_vector.len(),
                self.dimensions
            );
        }

        let mut scored: Vec<(String, f32)> = self
            .entries
            .iter()
            .filter(|(_, entry)| match filter {
                Some(f) => Self::passes(entry, f),
                None => true,
            })
            .map(|(chunk_id, entry)| {
                (chunk_id.clone(), cosine_similarity(query_vector, &entry.embedding))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dims: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dims];
        v[hot] = 1.0;
        v
    }

    #[tokio::test]
    async fn returns_nearest_by_cosine_similarity() {
        let mut store = InMemoryVectorStore::new(4);
        store
            .upsert("a", unit(4, 0), Tier::Child, ChunkType::Documents, "1.1")
            .unwrap();
        store
            .upsert("b", unit(4, 1), Tier::Child, ChunkType::Documents, "1.1")
            .unwrap();

        let results = store.search(&unit(4, 0), 2, None).await.unwrap();
        assert_eq!(results[0].0, "a");
        assert!(results[0].1 > results[1].1);
    }

    #[tokio::test]
    async fn filter_restricts_to_matching_tier_and_type() {
        let mut store = InMemoryVectorStore::new(4);
        store
            .upsert("parent", unit(4, 0), Tier::Parent, ChunkType::Overview, "1.1")
            .unwrap();
        store
            .upsert("child", unit(4, 0), Tier::Child, ChunkType::Documents, "1.1")
            .unwrap();

        let filter = VectorFilter::tier(Tier::Child);
        let results = store.search(&unit(4, 0), 10, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "child");
    }

    #[tokio::test]
    async fn rejects_mismatched_dimensions() {
        let store = InMemoryVectorStore::new(4);
        assert!(store.search(&[0.0, 1.0], 5, None).await.is_err());
    }
}
