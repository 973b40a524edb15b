//! Closed sum type for the eight query intents, plus the two lookup tables
//! (chunk-type filter, context budget) that replace runtime string dispatch
//! at the orchestrator's hot path.

use serde::{Deserialize, Serialize};

use crate::types::chunk::ChunkType;
use crate::types::plan::ContextConfig;

/// One of the eight closed categories that classify a user's question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// "What documents do I need?"
    Documents,
    /// "What are the eligibility requirements?"
    Requirements,
    /// "What is the procedure / steps?"
    Process,
    /// "What law governs this?"
    Legal,
    /// "How long does it take?"
    Timeline,
    /// "How much does it cost?"
    Fees,
    /// "Where do I go / which agency?"
    Location,
    /// Anything else, and the LLM-analyser fallback.
    Overview,
}

impl Intent {
    /// All eight variants, in the order they appear in the spec's tables.
    pub const ALL: [Intent; 8] = [
        Intent::Documents,
        Intent::Requirements,
        Intent::Process,
        Intent::Legal,
        Intent::Timeline,
        Intent::Fees,
        Intent::Location,
        Intent::Overview,
    ];

    /// Fallback intent used when classification fails or is unavailable.
    #[must_use]
    pub const fn fallback() -> Self {
        Intent::Overview
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::fallback()
    }
}

/// Stage-4 chunk-type filter for a given intent. `None` means "no filter" (overview).
#[must_use]
pub const fn chunk_type_filter(intent: Intent) -> Option<&'static [ChunkType]> {
    match intent {
        Intent::Documents => Some(&[ChunkType::Documents]),
        Intent::Requirements => Some(&[ChunkType::Requirements]),
        Intent::Process => Some(&[ChunkType::Process]),
        Intent::Legal => Some(&[ChunkType::Legal]),
        Intent::Timeline => Some(&[ChunkType::FeesTiming]),
        Intent::Fees => Some(&[ChunkType::FeesTiming]),
        Intent::Location => Some(&[ChunkType::Agencies]),
        Intent::Overview => None,
    }
}

/// Per-intent context budget, exact values from the spec's intent table.
#[must_use]
pub const fn context_config(intent: Intent) -> ContextConfig {
    match intent {
        Intent::Documents => ContextConfig {
            chunks: 2,
            max_descendants: 5,
            max_siblings: 2,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Fees => ContextConfig {
            chunks: 2,
            max_descendants: 3,
            max_siblings: 1,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Process => ContextConfig {
            chunks: 2,
            max_descendants: 40,
            max_siblings: 5,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Legal => ContextConfig {
            chunks: 3,
            max_descendants: 4,
            max_siblings: 3,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Timeline => ContextConfig {
            chunks: 3,
            max_descendants: 4,
            max_siblings: 3,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Requirements => ContextConfig {
            chunks: 2,
            max_descendants: 2,
            max_siblings: 3,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Location => ContextConfig {
            chunks: 2,
            max_descendants: 3,
            max_siblings: 1,
            include_parents: true,
            enable_structured_output: true,
        },
        Intent::Overview => ContextConfig {
            chunks: 3,
            max_descendants: 5,
            max_siblings: 2,
            include_parents: true,
            enable_structured_output: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_has_the_widest_descendant_budget() {
        let process = context_config(Intent::Process).max_descendants;
        for intent in Intent::ALL {
            if intent == Intent::Process {
                continue;
            }
            assert!(
                context_config(intent).max_descendants < process,
                "{intent:?} should keep fewer descendants than Process on the same corpus"
            );
        }
    }

    #[test]
    fn overview_disables_structured_output() {
        assert!(!context_config(Intent::Overview).enable_structured_output);
        for intent in Intent::ALL {
            if intent != Intent::Overview {
                assert!(context_config(intent).enable_structured_output);
            }
        }
    }

    #[test]
    fn overview_has_no_chunk_type_filter() {
        assert!(chunk_type_filter(Intent::Overview).is_none());
        for intent in Intent::ALL {
            if intent != Intent::Overview {
                assert!(chunk_type_filter(intent).is_some());
            }
        }
    }

    #[test]
    fn timeline_and_fees_share_the_fees_timing_filter() {
        assert_eq!(
            chunk_type_filter(Intent::Timeline),
            chunk_type_filter(Intent::Fees)
        );
    }
}
