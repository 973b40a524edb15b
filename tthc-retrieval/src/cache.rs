//! Semantic result cache (spec §4.4): short-circuits the pipeline for
//! semantically equivalent queries. The only mutable shared resource in the
//! system; every mutation and read is serialised behind a single lock so a
//! read that scans every entry for a cosine match never races a concurrent
//! `put`.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use parking_lot::ReentrantMutex;
use tthc_core::types::result::RetrievalResult;

struct CacheEntry {
    query_embedding: Vec<f32>,
    result: RetrievalResult,
    created_at: Instant,
    last_access: Instant,
}

/// Snapshot of cache counters (spec §6's `cache.stats()`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub expired: u64,
}

struct Inner {
    entries: std::collections::HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expired: u64,
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

/// LRU-evicted, TTL-expired, cosine-similarity-matched cache over
/// `RetrievalResult`s, keyed by the exact raw question with a fallback to
/// semantic similarity.
pub struct SemanticCache {
    max_size: usize,
    ttl: Duration,
    sim_threshold: f32,
    inner: ReentrantMutex<RefCell<Inner>>,
}

impl SemanticCache {
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration, sim_threshold: f32) -> Self {
        Self {
            max_size,
            ttl,
            sim_threshold,
            inner: ReentrantMutex::new(RefCell::new(Inner {
                entries: std::collections::HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
                expired: 0,
            })),
        }
    }

    /// Look up `question`. Exact string match wins if present and not
    /// expired; otherwise the stored embeddings are scanned for the
    /// nearest match by cosine similarity, returned if it clears
    /// `sim_threshold` and has not expired.
    #[must_use]
    pub fn get(&self, question: &str, query_vector: &[f32]) -> Option<RetrievalResult> {
        let now = Instant::now();
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        if let Some(entry) = inner.entries.get(question) {
            if now.duration_since(entry.created_at) <= self.ttl {
                let result = entry.result.clone();
                inner.entries.get_mut(question).unwrap().last_access = now;
                inner.hits += 1;
                return Some(result);
            }
        }

        let mut best: Option<(String, f32)> = None;
        for (key, entry) in &inner.entries {
            if now.duration_since(entry.created_at) > self.ttl {
                continue;
            }
            let similarity = cosine_similarity(query_vector, &entry.query_embedding);
            let improves = match &best {
                Some((_, best_sim)) => similarity > *best_sim,
                None => true,
            };
            if similarity >= self.sim_threshold && improves {
                best = Some((key.clone(), similarity));
            }
        }

        if let Some((key, _)) = best {
            let result = inner.entries[&key].result.clone();
            inner.entries.get_mut(&key).unwrap().last_access = now;
            inner.hits += 1;
            return Some(result);
        }

        inner.misses += 1;
        None
    }

    /// Insert or replace the entry for `question`. Evicts the
    /// least-recently-used entry first if at capacity.
    pub fn put(&self, question: &str, query_vector: Vec<f32>, result: RetrievalResult) {
        let now = Instant::now();
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        if !inner.entries.contains_key(question) && inner.entries.len() >= self.max_size {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone())
            {
                inner.entries.remove(&lru_key);
                inner.evictions += 1;
            }
        }

        inner.entries.insert(
            question.to_string(),
            CacheEntry {
                query_embedding: query_vector,
                result,
                created_at: now,
                last_access: now,
            },
        );
    }

    /// Remove every entry whose TTL has elapsed.
    pub fn clear_expired(&self) {
        let now = Instant::now();
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let ttl = self.ttl;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| now.duration_since(entry.created_at) <= ttl);
        let removed = (before - inner.entries.len()) as u64;
        inner.expired += removed;
    }

    /// Remove every entry, resetting size to zero but leaving counters intact.
    pub fn clear(&self) {
        self.inner.lock().borrow_mut().entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        let total = inner.hits + inner.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            inner.hits as f64 / total as f64
        };
        CacheStats {
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
            evictions: inner.evictions,
            expired: inner.expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tthc_core::intent::Intent;
    use tthc_core::types::plan::QueryPlan;
    use tthc_core::types::result::RetrievalMetadata;

    fn sample_result(question: &str) -> RetrievalResult {
        RetrievalResult {
            chunks: vec![],
            context_text: format!("context for {question}"),
            confidence: 0.8,
            intent: Intent::Overview,
            plan: QueryPlan::fallback(question),
            metadata: RetrievalMetadata::default(),
        }
    }

    fn unit_vector(dims: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dims];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn exact_match_hit_increments_hits() {
        let cache = SemanticCache::new(10, Duration::from_secs(3600), 0.92);
        cache.put("q1", unit_vector(4, 0), sample_result("q1"));
        let hit = cache.get("q1", &unit_vector(4, 0));
        assert!(hit.is_some());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn cache_idempotence_across_repeated_reads() {
        let cache = SemanticCache::new(10, Duration::from_secs(3600), 0.92);
        cache.put("q1", unit_vector(4, 0), sample_result("q1"));
        let first = cache.get("q1", &unit_vector(4, 0)).unwrap();
        let second = cache.get("q1", &unit_vector(4, 0)).unwrap();
        assert_eq!(first.context_text, second.context_text);
    }

    #[test]
    fn semantic_match_above_threshold_hits() {
        let cache = SemanticCache::new(10, Duration::from_secs(3600), 0.92);
        cache.put("q1", vec![1.0, 0.0, 0.0, 0.0], sample_result("q1"));
        // cos_sim([1,0,0,0], [0.99, 0.14, 0, 0]) is close to 1 once normalised.
        let near = vec![0.999, 0.045, 0.0, 0.0];
        let hit = cache.get("different phrasing", &near);
        assert!(hit.is_some());
    }

    #[test]
    fn dissimilar_vector_misses() {
        let cache = SemanticCache::new(10, Duration::from_secs(3600), 0.92);
        cache.put("q1", unit_vector(4, 0), sample_result("q1"));
        let miss = cache.get("totally different", &unit_vector(4, 1));
        assert!(miss.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn lru_eviction_drops_the_least_recently_used_entry() {
        let cache = SemanticCache::new(2, Duration::from_secs(3600), 0.92);
        cache.put("q1", unit_vector(8, 0), sample_result("q1"));
        std::thread::sleep(Duration::from_millis(5));
        cache.put("q2", unit_vector(8, 1), sample_result("q2"));
        std::thread::sleep(Duration::from_millis(5));
        // touch q2 so q1 remains the least-recently-used entry.
        cache.get("q2", &unit_vector(8, 1));
        std::thread::sleep(Duration::from_millis(5));
        cache.put("q3", unit_vector(8, 2), sample_result("q3"));

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.evictions, 1);
        assert!(cache.get("q1", &unit_vector(8, 0)).is_none());
    }

    #[test]
    fn clear_expired_removes_only_stale_entries() {
        let cache = SemanticCache::new(10, Duration::from_millis(10), 0.92);
        cache.put("q1", unit_vector(4, 0), sample_result("q1"));
        std::thread::sleep(Duration::from_millis(20));
        cache.clear_expired();
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().expired, 1);
    }
}
