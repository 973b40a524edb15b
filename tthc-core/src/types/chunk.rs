//! The chunk: the immutable unit of retrievable text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tier of a chunk within a procedure's hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Summarises an entire procedure.
    Parent,
    /// Carries one semantic section of a procedure.
    Child,
}

/// Semantic section a child chunk carries (parents always carry `Overview`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// Parent-only: the procedure summary.
    Overview,
    /// Required paperwork.
    Documents,
    /// Eligibility requirements.
    Requirements,
    /// Steps to carry out the procedure.
    Process,
    /// Governing legal basis.
    Legal,
    /// Fees and processing time.
    FeesTiming,
    /// Agencies/offices responsible.
    Agencies,
}

/// An immutable unit of retrievable text.
///
/// Invariants (enforced by [`Chunk::validate`], checked by the store on
/// load): `content` is non-empty, `token_count` is strictly positive, a
/// child chunk's tier/chunk_type pairing is never `(Child, Overview)`.
/// Uniqueness of `chunk_id` and parent existence are store-level invariants,
/// not checkable from a single chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique, stable across runs.
    pub chunk_id: String,
    /// Groups chunks belonging to the same procedure.
    pub procedure_id: String,
    /// Parent or child.
    pub tier: Tier,
    /// Which semantic section this chunk carries.
    pub chunk_type: ChunkType,
    /// UTF-8 text content.
    pub content: String,
    /// Token count under the reproducible tokeniser; must be > 0.
    pub token_count: u32,
    /// Free-form metadata: procedure name, code, domain, breadcrumb, importance.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// First ~200 characters of the parent, injected into child chunks to
    /// improve standalone embeddability.
    #[serde(default)]
    pub parent_context: Option<String>,
}

impl Chunk {
    /// Check the per-chunk invariants that don't require the rest of the store.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invariant violated.
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err(format!("chunk {} has empty content", self.chunk_id));
        }
        if self.token_count == 0 {
            return Err(format!("chunk {} has zero token_count", self.chunk_id));
        }
        if self.tier == Tier::Child && self.chunk_type == ChunkType::Overview {
            return Err(format!(
                "chunk {} is a child chunk but carries chunk_type=overview",
                self.chunk_id
            ));
        }
        if self.tier == Tier::Parent && self.chunk_type != ChunkType::Overview {
            return Err(format!(
                "chunk {} is a parent chunk but carries chunk_type={:?}",
                self.chunk_id, self.chunk_type
            ));
        }
        Ok(())
    }

    /// Convenience accessor for the procedure name, if present in metadata.
    #[must_use]
    pub fn procedure_name(&self) -> Option<&str> {
        self.metadata.get("procedure_name").and_then(Value::as_str)
    }

    /// Convenience accessor for the importance score, if present in metadata.
    #[must_use]
    pub fn importance(&self) -> Option<f64> {
        self.metadata.get("importance").and_then(Value::as_f64)
    }
}
