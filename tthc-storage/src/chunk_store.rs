//! JSON-backed chunk store.
//!
//! The chunk store is a single JSON file — a flat array of [`Chunk`] — loaded
//! once at startup and held read-only thereafter (spec §6: "Persistent
//! state... Neither is modified at query time").

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use tthc_core::types::chunk::{Chunk, ChunkType, Tier};

/// Stable ordering for child chunk types within a procedure, used by
/// `by_procedure` after the parent.
const CHUNK_TYPE_ORDER: [ChunkType; 6] = [
    ChunkType::Documents,
    ChunkType::Requirements,
    ChunkType::Process,
    ChunkType::Legal,
    ChunkType::FeesTiming,
    ChunkType::Agencies,
];

fn chunk_type_rank(chunk_type: ChunkType) -> usize {
    CHUNK_TYPE_ORDER
        .iter()
        .position(|candidate| *candidate == chunk_type)
        .unwrap_or(CHUNK_TYPE_ORDER.len())
}

/// A process-wide, read-only chunk store loaded from a JSON array of chunks.
#[derive(Debug, Clone)]
pub struct JsonChunkStore {
    by_id: HashMap<String, Chunk>,
    by_procedure: HashMap<String, Vec<String>>,
}

impl JsonChunkStore {
    /// Load chunks from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, doesn't parse, or any
    /// chunk violates a store-level invariant.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading chunk store file {}", path.display()))?;
        let chunks: Vec<Chunk> = serde_json::from_str(&content)
            .with_context(|| format!("parsing chunk store file {}", path.display()))?;
        Self::from_chunks(chunks)
    }

    /// Build a store from an in-memory chunk list, validating invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if any per-chunk invariant fails, `chunk_id`s
    /// collide, a child chunk references a missing parent, or two parent
    /// overviews share the same `(procedure_id, chunk_type)`.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(chunks.len());
        let mut by_procedure: HashMap<String, Vec<String>> = HashMap::new();
        let mut parent_overviews: HashMap<(String, ChunkType), usize> = HashMap::new();

        for chunk in chunks {
            chunk.validate().map_err(|message| anyhow!(message))?;

            if by_id.contains_key(&chunk.chunk_id) {
                bail!("duplicate chunk_id {}", chunk.chunk_id);
            }

            if chunk.tier == Tier::Parent {
                let key = (chunk.procedure_id.clone(), chunk.chunk_type);
                let count = parent_overviews.entry(key).or_insert(0);
                *count += 1;
                if *count > 1 {
                    bail!(
                        "procedure {} has more than one parent overview",
                        chunk.procedure_id
                    );
                }
            }

            by_procedure
                .entry(chunk.procedure_id.clone())
                .or_default()
                .push(chunk.chunk_id.clone());

            by_id.insert(chunk.chunk_id.clone(), chunk);
        }

        // Every child references a parent that exists in the same store.
        for chunk in by_id.values() {
            if chunk.tier == Tier::Child {
                let has_parent = by_id
                    .values()
                    .any(|other| other.tier == Tier::Parent && other.procedure_id == chunk.procedure_id);
                if !has_parent {
                    bail!(
                        "child chunk {} references procedure {} with no parent overview",
                        chunk.chunk_id,
                        chunk.procedure_id
                    );
                }
            }
        }

        for ids in by_procedure.values_mut() {
            ids.sort_by_key(|id| {
                let chunk = &by_id[id];
                match chunk.tier {
                    Tier::Parent => (0, 0),
                    Tier::Child => (1, chunk_type_rank(chunk.chunk_type)),
                }
            });
        }

        Ok(Self {
            by_id,
            by_procedure,
        })
    }
}

impl tthc_core::traits::ChunkStore for JsonChunkStore {
    fn get(&self, chunk_id: &str) -> Result<Chunk> {
        self.by_id
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| anyhow!("chunk not found: {chunk_id}"))
    }

    fn by_procedure(&self, procedure_id: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .by_procedure
            .get(procedure_id)
            .into_iter()
            .flatten()
            .map(|id| self.by_id[id].clone())
            .collect())
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}
