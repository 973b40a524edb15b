//! Context assembler (spec §4.6): turns a reranked candidate list into a
//! single textual context block, respecting the per-intent chunk,
//! descendant and sibling budgets and truncating any chunk that exceeds
//! the per-chunk token ceiling.

use std::collections::HashMap;

use tthc_core::traits::ChunkStore;
use tthc_core::types::chunk::{Chunk, Tier};
use tthc_core::types::plan::ContextConfig;
use tthc_core::types::result::RetrievedChunk;

const ELLIPSIS_MARKER: &str = "... [lược bớt] ...";

/// Truncate `content` to at most `max_tokens` words using a
/// keep-head-and-tail strategy: the first half and the last half of the
/// word sequence, joined by an explicit ellipsis marker.
fn truncate_keep_head_and_tail(content: &str, max_tokens: u32) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let max_tokens = max_tokens as usize;
    if words.len() <= max_tokens {
        return content.to_string();
    }

    let half = max_tokens / 2;
    let head = &words[..half];
    let tail = &words[words.len() - (max_tokens - half)..];
    format!("{} {ELLIPSIS_MARKER} {}", head.join(" "), tail.join(" "))
}

/// One procedure's contribution to the assembled context: its best-rank
/// position in the reranked list, plus the child chunks (score-ordered)
/// retrieved for it.
struct ProcedureGroup {
    best_rank: usize,
    chunks: Vec<(String, f32)>,
}

/// Assembles final context text and retained chunk list from a reranked
/// candidate list, given the chunk store and the intent's context budget.
pub struct ContextAssembler<'a> {
    chunk_store: &'a dyn ChunkStore,
    max_chunk_tokens: u32,
}

/// Result of assembling context: the retained chunks, the concatenated
/// text, and the mean reranked score before any `degraded` scaling.
pub struct Assembled {
    pub chunks: Vec<RetrievedChunk>,
    pub context_text: String,
    pub mean_score: f32,
}

impl<'a> ContextAssembler<'a> {
    #[must_use]
    pub fn new(chunk_store: &'a dyn ChunkStore, max_chunk_tokens: u32) -> Self {
        Self {
            chunk_store,
            max_chunk_tokens,
        }
    }

    /// Run the assembly algorithm over `reranked` (chunk_id, score pairs,
    /// best first) under `config`.
    #[must_use]
    pub fn assemble(&self, reranked: &[(String, f32)], config: &ContextConfig) -> Assembled {
        let mut chunk_cache: HashMap<String, Chunk> = HashMap::new();
        for (chunk_id, _) in reranked {
            if !chunk_cache.contains_key(chunk_id) {
                if let Ok(chunk) = self.chunk_store.get(chunk_id) {
                    chunk_cache.insert(chunk_id.clone(), chunk);
                }
            }
        }

        // Step 1: group by procedure, preserving each procedure's best
        // (lowest index = highest score) rank. Parent/overview chunks can
        // appear in `reranked` (Stage 3 fuses parent hits into the same
        // ranked list), but the parent is handled separately below via
        // `config.include_parents`, so only child chunks are grouped here.
        let mut groups: HashMap<String, ProcedureGroup> = HashMap::new();
        let mut procedure_order: Vec<String> = Vec::new();
        for (rank, (chunk_id, score)) in reranked.iter().enumerate() {
            let Some(chunk) = chunk_cache.get(chunk_id) else {
                continue;
            };
            if chunk.tier != Tier::Child {
                continue;
            }
            let group = groups.entry(chunk.procedure_id.clone()).or_insert_with(|| {
                procedure_order.push(chunk.procedure_id.clone());
                ProcedureGroup {
                    best_rank: rank,
                    chunks: Vec::new(),
                }
            });
            group.chunks.push((chunk_id.clone(), *score));
        }

        // Step 2: keep the top config.chunks procedures, ordered by best rank.
        procedure_order.sort_by_key(|procedure_id| groups[procedure_id].best_rank);
        let kept_procedures: Vec<String> = procedure_order.into_iter().take(config.chunks).collect();
        let kept_set: std::collections::HashSet<&str> =
            kept_procedures.iter().map(String::as_str).collect();

        let mut retained: Vec<RetrievedChunk> = Vec::new();
        let mut seen_chunk_ids: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut sections: Vec<String> = Vec::new();
        let mut reranked_scores: Vec<f32> = Vec::new();

        for procedure_id in &kept_procedures {
            let group = &groups[procedure_id];

            if config.include_parents {
                if let Ok(parent) = self.chunk_store.by_procedure(procedure_id).map(|chunks| {
                    chunks.into_iter().find(|c| c.tier == Tier::Parent)
                }) {
                    if let Some(parent) = parent {
                        self.push_chunk(&parent, None, &mut retained, &mut sections, &mut seen_chunk_ids);
                    }
                }
            }

            let mut scored_children = group.chunks.clone();
            scored_children.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            for (chunk_id, score) in scored_children.into_iter().take(config.max_descendants) {
                if let Some(chunk) = chunk_cache.get(&chunk_id).cloned() {
                    let inserted = self.push_chunk(&chunk, Some(score), &mut retained, &mut sections, &mut seen_chunk_ids);
                    if inserted {
                        reranked_scores.push(score);
                    }
                }
            }
        }

        // Step 4: sibling enrichment — up to max_siblings chunks from
        // procedures not already kept, in reranked order.
        let mut siblings_added = 0usize;
        for (chunk_id, score) in reranked {
            if siblings_added >= config.max_siblings {
                break;
            }
            if seen_chunk_ids.contains(chunk_id) {
                continue;
            }
            let Some(chunk) = chunk_cache.get(chunk_id) else {
                continue;
            };
            if kept_set.contains(chunk.procedure_id.as_str()) {
                continue;
            }
            let chunk = chunk.clone();
            let inserted = self.push_chunk(&chunk, Some(*score), &mut retained, &mut sections, &mut seen_chunk_ids);
            if inserted {
                reranked_scores.push(*score);
                siblings_added += 1;
            }
        }

        // Parent/overview chunks are pushed separately above and never
        // enter `group.chunks`/`reranked_scores`, so confidence is the
        // mean of only the child chunks that actually carried a reranked
        // score.
        let mean_score = if reranked_scores.is_empty() {
            0.0
        } else {
            reranked_scores.iter().sum::<f32>() / reranked_scores.len() as f32
        };

        Assembled {
            chunks: retained,
            context_text: sections.join("\n\n"),
            mean_score: mean_score.clamp(0.0, 1.0),
        }
    }

    /// Inserts `chunk` into the assembled output, returning `true` if it
    /// was a new id. A no-op (returns `false`) if already seen.
    fn push_chunk(
        &self,
        chunk: &Chunk,
        score: Option<f32>,
        retained: &mut Vec<RetrievedChunk>,
        sections: &mut Vec<String>,
        seen: &mut std::collections::HashSet<String>,
    ) -> bool {
        if !seen.insert(chunk.chunk_id.clone()) {
            return false;
        }
        let content = truncate_keep_head_and_tail(&chunk.content, self.max_chunk_tokens);
        sections.push(format!("[{}] {}\n{}", chunk.chunk_id, chunk.procedure_id, content));
        retained.push(RetrievedChunk {
            chunk_id: chunk.chunk_id.clone(),
            procedure_id: chunk.procedure_id.clone(),
            content,
            score: score.unwrap_or(1.0),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tthc_core::types::chunk::ChunkType;

    struct FixtureStore {
        chunks: Vec<Chunk>,
    }

    impl ChunkStore for FixtureStore {
        fn get(&self, chunk_id: &str) -> Result<Chunk> {
            self.chunks
                .iter()
                .find(|c| c.chunk_id == chunk_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("not found"))
        }

        fn by_procedure(&self, procedure_id: &str) -> Result<Vec<Chunk>> {
            Ok(self
                .chunks
                .iter()
                .filter(|c| c.procedure_id == procedure_id)
                .cloned()
                .collect())
        }

        fn len(&self) -> usize {
            self.chunks.len()
        }
    }

    fn parent(procedure_id: &str) -> Chunk {
        Chunk {
            chunk_id: format!("{procedure_id}-parent"),
            procedure_id: procedure_id.to_string(),
            tier: Tier::Parent,
            chunk_type: ChunkType::Overview,
            content: "Tổng quan thủ tục".to_string(),
            token_count: 10,
            metadata: HashMap::new(),
            parent_context: None,
        }
    }

    fn child(procedure_id: &str, suffix: &str, content: &str) -> Chunk {
        Chunk {
            chunk_id: format!("{procedure_id}-{suffix}"),
            procedure_id: procedure_id.to_string(),
            tier: Tier::Child,
            chunk_type: ChunkType::Documents,
            content: content.to_string(),
            token_count: content.split_whitespace().count() as u32,
            metadata: HashMap::new(),
            parent_context: Some("parent...".to_string()),
        }
    }

    fn config(chunks: usize, max_descendants: usize, max_siblings: usize) -> ContextConfig {
        ContextConfig {
            chunks,
            max_descendants,
            max_siblings,
            include_parents: true,
            enable_structured_output: true,
        }
    }

    #[test]
    fn keeps_at_most_config_chunks_procedures() {
        let chunks = vec![
            parent("1.1"),
            child("1.1", "docs", "nội dung A"),
            parent("1.2"),
            child("1.2", "docs", "nội dung B"),
            parent("1.3"),
            child("1.3", "docs", "nội dung C"),
        ];
        let store = FixtureStore { chunks };
        let assembler = ContextAssembler::new(&store, 1200);
        let reranked = vec![
            ("1.1-docs".to_string(), 0.9),
            ("1.2-docs".to_string(), 0.8),
            ("1.3-docs".to_string(), 0.7),
        ];
        let assembled = assembler.assemble(&reranked, &config(2, 5, 0));
        let procedures: std::collections::HashSet<&str> =
            assembled.chunks.iter().map(|c| c.procedure_id.as_str()).collect();
        assert_eq!(procedures.len(), 2);
    }

    #[test]
    fn truncates_chunks_exceeding_the_token_ceiling() {
        let long_content = (0..20).map(|i| format!("từ{i}")).collect::<Vec<_>>().join(" ");
        let chunks = vec![parent("1.1"), child("1.1", "docs", &long_content)];
        let store = FixtureStore { chunks };
        let assembler = ContextAssembler::new(&store, 10);
        let reranked = vec![("1.1-docs".to_string(), 0.9)];
        let assembled = assembler.assemble(&reranked, &config(2, 5, 0));
        let retained = assembled.chunks.iter().find(|c| c.chunk_id == "1.1-docs").unwrap();
        assert!(retained.content.contains(ELLIPSIS_MARKER));
    }

    #[test]
    fn parent_hit_in_the_reranked_list_does_not_consume_a_descendant_slot() {
        // Stage 3 fuses parent hits into the same ranked list passed to
        // `assemble`, so the parent's own chunk id can rank above its
        // children here.
        let chunks = vec![
            parent("1.1"),
            child("1.1", "a", "nội dung một"),
            child("1.1", "b", "nội dung hai"),
        ];
        let store = FixtureStore { chunks };
        let assembler = ContextAssembler::new(&store, 1200);
        let reranked = vec![
            ("1.1-parent".to_string(), 0.95),
            ("1.1-a".to_string(), 0.9),
            ("1.1-b".to_string(), 0.8),
        ];
        let assembled = assembler.assemble(&reranked, &config(2, 1, 0));

        let children = assembled
            .chunks
            .iter()
            .filter(|c| c.chunk_id != "1.1-parent")
            .count();
        assert_eq!(children, 1);
        // Only the child's score should feed the mean, not the parent's.
        assert!((assembled.mean_score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn no_content_exceeds_max_descendants_per_procedure() {
        let chunks = vec![
            parent("1.1"),
            child("1.1", "a", "nội dung một"),
            child("1.1", "b", "nội dung hai"),
            child("1.1", "c", "nội dung ba"),
        ];
        let store = FixtureStore { chunks };
        let assembler = ContextAssembler::new(&store, 1200);
        let reranked = vec![
            ("1.1-a".to_string(), 0.9),
            ("1.1-b".to_string(), 0.8),
            ("1.1-c".to_string(), 0.7),
        ];
        let assembled = assembler.assemble(&reranked, &config(2, 1, 0));
        let children = assembled
            .chunks
            .iter()
            .filter(|c| c.chunk_id != "1.1-parent")
            .count();
        assert_eq!(children, 1);
    }
}
