//! Reciprocal rank fusion (Stage 6) and near-duplicate collapsing.

use std::collections::HashMap;

use tthc_core::types::retrieved::{RetrievedItem, Source};

/// One ranked list contributed by a single retrieval channel.
pub struct RankedList {
    pub source: Source,
    /// `(chunk_id, score)` pairs, best first. `score` is only used to break
    /// ties when two chunks tie on RRF contribution; RRF itself is rank-only.
    pub ranked: Vec<(String, f32)>,
    /// Multiplier applied to this list's RRF contribution (the BM25 1.2x
    /// boost from spec §4.7 Stage 6).
    pub boost: f32,
}

struct Accumulator {
    rrf_score: f32,
    best_rank: usize,
    source: Source,
}

/// Fuse multiple ranked lists by `RRF(d) = sum(boost_i / (k + rank_i(d)))`,
/// deduplicating by `chunk_id` and carrying the best (lowest) rank seen for
/// each chunk across all lists.
#[must_use]
pub fn reciprocal_rank_fusion(lists: &[RankedList], k: u32) -> Vec<RetrievedItem> {
    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();

    for list in lists {
        for (rank0, (chunk_id, _score)) in list.ranked.iter().enumerate() {
            let rank = rank0 + 1;
            let contribution = list.boost / (k as f32 + rank as f32);
            let entry = accumulators.entry(chunk_id.clone()).or_insert(Accumulator {
                rrf_score: 0.0,
                best_rank: rank,
                source: list.source,
            });
            entry.rrf_score += contribution;
            if rank < entry.best_rank {
                entry.best_rank = rank;
                entry.source = list.source;
            }
        }
    }

    let mut items: Vec<RetrievedItem> = accumulators
        .into_iter()
        .map(|(chunk_id, accumulator)| RetrievedItem {
            chunk_id,
            score: accumulator.rrf_score,
            source: Source::Fused,
            rank_per_source: Some(accumulator.best_rank),
            cross_tier_match: false,
        })
        .collect();

    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    items
}

fn word_set(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Remove near-duplicates from a fused, score-descending list: whenever two
/// surviving items' backing text has Jaccard similarity `>= threshold`, keep
/// only the higher-scoring one.
#[must_use]
pub fn remove_near_duplicates(
    items: Vec<RetrievedItem>,
    content_by_chunk_id: &HashMap<String, String>,
    threshold: f32,
) -> Vec<RetrievedItem> {
    let mut kept: Vec<RetrievedItem> = Vec::with_capacity(items.len());
    let mut kept_word_sets: Vec<std::collections::HashSet<String>> = Vec::with_capacity(items.len());

    for item in items {
        let words = content_by_chunk_id
            .get(&item.chunk_id)
            .map(|content| word_set(content))
            .unwrap_or_default();

        let is_duplicate = kept_word_sets
            .iter()
            .any(|existing| jaccard(existing, &words) >= threshold);

        if !is_duplicate {
            kept_word_sets.push(words);
            kept.push(item);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuses_two_lists_favouring_top_ranked_overlap() {
        let lists = vec![
            RankedList {
                source: Source::Dense,
                ranked: vec![("a".to_string(), 0.9), ("b".to_string(), 0.5)],
                boost: 1.0,
            },
            RankedList {
                source: Source::Lexical,
                ranked: vec![("a".to_string(), 10.0), ("c".to_string(), 3.0)],
                boost: 1.2,
            },
        ];
        let fused = reciprocal_rank_fusion(&lists, 60);
        assert_eq!(fused[0].chunk_id, "a");
        assert!(fused.iter().any(|i| i.chunk_id == "b"));
        assert!(fused.iter().any(|i| i.chunk_id == "c"));
    }

    #[test]
    fn bm25_boost_increases_its_contribution() {
        let unboosted = vec![RankedList {
            source: Source::Lexical,
            ranked: vec![("x".to_string(), 1.0)],
            boost: 1.0,
        }];
        let boosted = vec![RankedList {
            source: Source::Lexical,
            ranked: vec![("x".to_string(), 1.0)],
            boost: 1.2,
        }];
        let unboosted_score = reciprocal_rank_fusion(&unboosted, 60)[0].score;
        let boosted_score = reciprocal_rank_fusion(&boosted, 60)[0].score;
        assert!(boosted_score > unboosted_score);
    }

    #[test]
    fn near_duplicates_collapse_to_the_higher_scoring_item() {
        let items = vec![
            RetrievedItem::new("a", 0.9, Source::Fused, 1),
            RetrievedItem::new("b", 0.5, Source::Fused, 2),
        ];
        let mut content = HashMap::new();
        content.insert("a".to_string(), "hồ sơ đăng ký kết hôn gồm giấy tờ".to_string());
        content.insert("b".to_string(), "hồ sơ đăng ký kết hôn gồm giấy tờ".to_string());

        let deduped = remove_near_duplicates(items, &content, 0.95);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].chunk_id, "a");
    }

    #[test]
    fn dissimilar_content_is_kept_separately() {
        let items = vec![
            RetrievedItem::new("a", 0.9, Source::Fused, 1),
            RetrievedItem::new("b", 0.5, Source::Fused, 2),
        ];
        let mut content = HashMap::new();
        content.insert("a".to_string(), "hồ sơ đăng ký kết hôn".to_string());
        content.insert("b".to_string(), "quy trình đấu thầu dự án công".to_string());

        let deduped = remove_near_duplicates(items, &content, 0.95);
        assert_eq!(deduped.len(), 2);
    }
}
