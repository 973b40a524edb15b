//! The query plan: a transient, per-request artefact produced by the query
//! analyser and consumed by every later orchestrator stage.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;

/// Per-intent chunk/descendant/sibling budget consumed by the context assembler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum number of distinct procedures kept in the assembled context.
    pub chunks: usize,
    /// Maximum number of child chunks kept per procedure.
    pub max_descendants: usize,
    /// Maximum number of cross-procedure "sibling" chunks appended.
    pub max_siblings: usize,
    /// Whether to prepend each kept procedure's parent overview.
    pub include_parents: bool,
    /// Whether the generator should be told to produce structured output.
    pub enable_structured_output: bool,
}

/// Transient, per-request query plan. Created by the analyser, destroyed
/// when the response is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    /// The question exactly as the caller provided it.
    pub raw_question: String,
    /// Classified intent.
    pub intent: Intent,
    /// Confidence in [0, 1]; 0 on classifier fallback.
    pub intent_confidence: f32,
    /// Up to five deduplicated paraphrases/synonym variants, including the raw question.
    pub expansions: Vec<String>,
    /// Procedure code detected via `\b\d+\.\d{5,7}\b`, if any.
    pub detected_procedure_code: Option<String>,
    /// Per-intent context budget, resolved once so later stages don't re-derive it.
    pub context_config: ContextConfig,
}

impl QueryPlan {
    /// Maximum number of expansions the analyser is allowed to produce.
    pub const MAX_EXPANSIONS: usize = 5;

    /// Build the fallback plan used when the LLM analyser fails entirely:
    /// `overview` intent, confidence 0, expansions = `[raw_question]`.
    #[must_use]
    pub fn fallback(raw_question: impl Into<String>) -> Self {
        let raw_question = raw_question.into();
        Self {
            expansions: vec![raw_question.clone()],
            raw_question,
            intent: Intent::fallback(),
            intent_confidence: 0.0,
            detected_procedure_code: None,
            context_config: crate::intent::context_config(Intent::fallback()),
        }
    }
}
