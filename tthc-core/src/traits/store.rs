//! Chunk store and lexical (BM25) index traits.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::types::chunk::Chunk;

/// Keeps chunks addressable by id and by procedure. A process-wide,
/// read-only singleton constructed once at startup and rebuilt whenever the
/// backing store is reloaded.
pub trait ChunkStore: Send + Sync {
    /// Look up a single chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if no chunk with this id exists.
    fn get(&self, chunk_id: &str) -> Result<Chunk>;

    /// All chunks belonging to a procedure, parent first, then children in
    /// stable `chunk_type` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn by_procedure(&self, procedure_id: &str) -> Result<Vec<Chunk>>;

    /// Total number of chunks held by the store.
    fn len(&self) -> usize;

    /// Whether the store holds no chunks.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of the lexical index's internal statistics, exposed verbatim by
/// `lexical.stats()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LexicalStats {
    /// Number of documents (chunks) indexed.
    pub num_docs: usize,
    /// Average document length in tokens.
    pub avg_doc_length: f64,
    /// Number of distinct terms after stopword removal.
    pub vocab_size: usize,
    /// BM25 `k1` parameter in effect.
    pub k1: f32,
    /// BM25 `b` parameter in effect.
    pub b: f32,
}

/// BM25 full-text search over the chunk store. A pure function of the
/// chunk store: it must be rebuilt whenever the store reloads, and must be
/// ready before the orchestrator accepts its first query.
pub trait LexicalIndex: Send + Sync {
    /// Okapi BM25 search with inverse-document-frequency clamped at zero.
    ///
    /// # Errors
    ///
    /// Returns an error only if the index itself failed to build; an empty
    /// query or corpus simply yields an empty result set.
    fn bm25_search(&self, query: &str, k: usize) -> Result<Vec<(String, f32)>>;

    /// Current index statistics.
    fn stats(&self) -> LexicalStats;
}
