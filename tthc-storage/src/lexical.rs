//! BM25 lexical index over the chunk store.
//!
//! Tokenisation: lowercase, split on whitespace and punctuation, drop a
//! fixed set of Vietnamese stop-words. Scoring is the standard Okapi BM25
//! formula with inverse-document-frequency clamped at zero, so that very
//! common terms never push a document's score negative.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tthc_core::traits::{ChunkStore, LexicalStats};

/// ~50 high-frequency Vietnamese function words dropped during tokenisation.
/// Chosen so that inserting one between two content words (e.g. "đăng ký"
/// vs. "đăng ký và kết hôn") does not change BM25's top-k (property 4 of the
/// spec's testable properties).
const STOPWORDS: &[&str] = &[
    "và", "là", "của", "có", "được", "cho", "các", "một", "những", "này",
    "đó", "khi", "để", "với", "về", "trong", "ngoài", "trên", "dưới", "từ",
    "theo", "tại", "hay", "hoặc", "nếu", "thì", "nên", "vì", "do", "bởi",
    "như", "đã", "sẽ", "đang", "vẫn", "cũng", "chỉ", "rất", "quá", "lại",
    "nữa", "mà", "ai", "gì", "sao", "nào", "bao", "nhiêu", "ấy", "kia",
    "đây", "đấy",
];

fn stopwords() -> &'static HashSet<&'static str> {
    use std::sync::OnceLock;
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Lowercase, split on whitespace/punctuation, drop stopwords.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let stop = stopwords();
    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .filter(|token| !stop.contains(token))
        .map(str::to_string)
        .collect()
}

/// A single document's term frequency table plus its length in tokens.
#[derive(Clone)]
struct Document {
    chunk_id: String,
    term_freq: HashMap<String, u32>,
    length: u32,
}

/// Okapi BM25 index, rebuilt whenever the chunk store reloads.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    k1: f32,
    b: f32,
    docs: Vec<Document>,
    doc_freq: HashMap<String, usize>,
    avg_doc_length: f64,
}

impl Bm25Index {
    /// Build the index from an explicit list of chunk ids, looking each up
    /// in `store`. A chunk store only exposes point and by-procedure lookups
    /// (§4.2 of the spec), so the index owner — whoever loaded the backing
    /// JSON file — is responsible for knowing the full id set and passing it
    /// in here. Parameters default to `k1 = 1.5`, `b = 0.75` per the spec's
    /// committed default (the `1.2` alternative found in donor docs is left
    /// as the configurable alternative, not the default).
    #[must_use]
    pub fn build(store: &dyn ChunkStore, ids: &[String], k1: f32, b: f32) -> Self {
        let mut docs = Vec::with_capacity(ids.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_length: u64 = 0;

        for chunk_id in ids {
            let Ok(chunk) = store.get(chunk_id) else {
                continue;
            };
            let tokens = tokenize(&chunk.content);
            let length = u32::try_from(tokens.len()).unwrap_or(u32::MAX);
            total_length += u64::from(length);

            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            docs.push(Document {
                chunk_id: chunk_id.clone(),
                term_freq,
                length,
            });
        }

        let avg_doc_length = if docs.is_empty() {
            0.0
        } else {
            total_length as f64 / docs.len() as f64
        };

        Self {
            k1,
            b,
            docs,
            doc_freq,
            avg_doc_length,
        }
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
        // Clamp at zero: very common terms never push the score negative.
        (((n - df + 0.5) / (df + 0.5) + 1.0).ln()).max(0.0)
    }

    fn score(&self, doc: &Document, query_terms: &[String]) -> f32 {
        let mut score = 0.0_f32;
        for term in query_terms {
            let Some(&tf) = doc.term_freq.get(term) else {
                continue;
            };
            let tf = tf as f32;
            let idf = self.idf(term);
            let doc_length = doc.length as f32;
            let avg_length = (self.avg_doc_length.max(1.0)) as f32;
            let len_norm = 1.0 - self.b + self.b * (doc_length / avg_length);
            score += idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * len_norm);
        }
        score
    }
}

impl tthc_core::traits::LexicalIndex for Bm25Index {
    fn bm25_search(&self, query: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(String, f32)> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let score = self.score(doc, &query_terms);
                (score > 0.0).then(|| (doc.chunk_id.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    fn stats(&self) -> LexicalStats {
        LexicalStats {
            num_docs: self.docs.len(),
            avg_doc_length: self.avg_doc_length,
            vocab_size: self.doc_freq.len(),
            k1: self.k1,
            b: self.b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use tthc_core::traits::{ChunkStore as ChunkStoreTrait, LexicalIndex as _};
    use tthc_core::types::chunk::{Chunk, ChunkType, Tier};

    struct FixtureStore {
        chunks: Vec<Chunk>,
    }

    impl ChunkStoreTrait for FixtureStore {
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

    fn chunk(id: &str, content: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            procedure_id: "1.1".to_string(),
            tier: Tier::Child,
            chunk_type: ChunkType::Documents,
            content: content.to_string(),
            token_count: content.split_whitespace().count() as u32,
            metadata: Map::new(),
            parent_context: None,
        }
    }

    fn build(chunks: Vec<Chunk>) -> Bm25Index {
        let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let store = FixtureStore { chunks };
        Bm25Index::build(&store, &ids, 1.5, 0.75)
    }

    #[test]
    fn stopword_invariance_matches_top_k() {
        let index = build(vec![
            chunk("a", "đăng ký kết hôn tại ủy ban nhân dân"),
            chunk("b", "hồ sơ xin cấp giấy chứng nhận"),
        ]);

        let with_stopword = index.bm25_search("đăng ký và kết hôn", 10).unwrap();
        let without_stopword = index.bm25_search("đăng ký kết hôn", 10).unwrap();

        let ids_with: Vec<&str> = with_stopword.iter().map(|(id, _)| id.as_str()).collect();
        let ids_without: Vec<&str> = without_stopword.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids_with, ids_without);
    }

    #[test]
    fn ranks_exact_term_match_first() {
        let index = build(vec![
            chunk("a", "đăng ký kết hôn cần chứng minh nhân dân"),
            chunk("b", "thủ tục khai sinh cho trẻ em"),
        ]);

        let results = index.bm25_search("đăng ký kết hôn", 10).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn empty_query_returns_no_results() {
        let index = build(vec![chunk("a", "nội dung bất kỳ")]);
        let results = index.bm25_search("và là của", 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn stats_report_index_shape() {
        let index = build(vec![
            chunk("a", "một hai ba"),
            chunk("b", "một hai ba bốn năm"),
        ]);
        let stats = index.stats();
        assert_eq!(stats.num_docs, 2);
        assert!((stats.k1 - 1.5).abs() < f32::EPSILON);
        assert!((stats.b - 0.75).abs() < f32::EPSILON);
        assert!(stats.vocab_size > 0);
    }
}
