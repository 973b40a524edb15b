//! Deterministic in-process collaborators. These never make a network
//! call; they exist so tests and local demos can exercise the full
//! orchestrator without a live embedding service, LLM, or reranker.

use anyhow::Result;
use async_trait::async_trait;
use tthc_core::intent::Intent;
use tthc_core::traits::{Embedder, LlmAnalyzer, Reranker};

/// Hashes text into a deterministic, unit-length vector. Not a real
/// embedding model: it has no notion of semantics beyond rewarding shared
/// tokens, but that's enough for cosine similarity to behave sensibly in
/// tests (same text -> same vector, overlapping vocabulary -> higher
/// similarity).
#[derive(Debug, Clone, Copy)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// 1024-dimensional embedder matching the spec's fixed dimensionality.
    #[must_use]
    pub const fn standard() -> Self {
        Self::new(1024)
    }

    fn token_hash(token: &str, dims: usize) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (hash as usize) % dims
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let tokens: Vec<&str> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Ok(vector);
        }

        for token in &tokens {
            let index = Self::token_hash(token, self.dimensions);
            vector[index] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Keyword-rule intent classifier and a trivial synonym-substitution
/// paraphraser. Stands in for the real LLM-backed analyser in tests and the
/// CLI demo.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockLlmAnalyzer;

const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Documents, &["giấy tờ", "hồ sơ", "tài liệu", "chứng minh"]),
    (Intent::Requirements, &["điều kiện", "yêu cầu", "đủ tuổi"]),
    (Intent::Process, &["thủ tục", "quy trình", "các bước", "làm sao"]),
    (Intent::Legal, &["luật", "nghị định", "quy định", "văn bản pháp luật"]),
    (Intent::Timeline, &["bao lâu", "thời gian", "mất mấy ngày"]),
    (Intent::Fees, &["phí", "lệ phí", "bao nhiêu tiền", "giá"]),
    (Intent::Location, &["ở đâu", "cơ quan nào", "nộp tại"]),
];

const SYNONYMS: &[(&str, &str)] = &[
    ("giấy tờ", "tài liệu"),
    ("thủ tục", "quy trình"),
    ("bao lâu", "mất thời gian bao lâu"),
    ("phí", "lệ phí"),
    ("ở đâu", "tại cơ quan nào"),
];

#[async_trait]
impl LlmAnalyzer for MockLlmAnalyzer {
    async fn classify_intent(&self, question: &str) -> Result<(Intent, f32)> {
        let lower = question.to_lowercase();
        for (intent, keywords) in INTENT_KEYWORDS {
            if keywords.iter().any(|keyword| lower.contains(keyword)) {
                return Ok((*intent, 0.85));
            }
        }
        Ok((Intent::fallback(), 0.3))
    }

    async fn paraphrase(&self, question: &str, n: usize) -> Result<Vec<String>> {
        let lower = question.to_lowercase();
        let mut variants = Vec::new();
        for (from, to) in SYNONYMS {
            if lower.contains(from) {
                variants.push(lower.replacen(from, to, 1));
            }
            if variants.len() >= n {
                break;
            }
        }
        variants.truncate(n);
        Ok(variants)
    }
}

/// Scores a (query, text) pair by normalised token overlap. A stand-in for
/// a real cross-encoder: monotone in shared vocabulary, bounded to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockReranker;

fn tokens_of(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Reranker for MockReranker {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let query_tokens = tokens_of(query);
        if query_tokens.is_empty() {
            return Ok(vec![0.0; texts.len()]);
        }

        Ok(texts
            .iter()
            .map(|text| {
                let text_tokens = tokens_of(text);
                let overlap = query_tokens.intersection(&text_tokens).count();
                overlap as f32 / query_tokens.len() as f32
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedder_is_deterministic_and_unit_length() {
        let embedder = MockEmbedder::standard();
        let a = embedder.embed("đăng ký kết hôn").await.unwrap();
        let b = embedder.embed("đăng ký kết hôn").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1024);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn classifier_detects_documents_intent() {
        let analyzer = MockLlmAnalyzer;
        let (intent, confidence) = analyzer
            .classify_intent("Cần giấy tờ gì để đăng ký kết hôn?")
            .await
            .unwrap();
        assert_eq!(intent, Intent::Documents);
        assert!(confidence > 0.5);
    }

    #[tokio::test]
    async fn unclassifiable_question_falls_back_to_overview() {
        let analyzer = MockLlmAnalyzer;
        let (intent, _) = analyzer.classify_intent("Xin chào").await.unwrap();
        assert_eq!(intent, Intent::fallback());
    }

    #[tokio::test]
    async fn reranker_scores_full_overlap_as_one() {
        let reranker = MockReranker;
        let scores = reranker
            .score("kết hôn", &["kết hôn".to_string(), "ly hôn đất đai".to_string()])
            .await
            .unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores[1] < scores[0]);
    }
}
