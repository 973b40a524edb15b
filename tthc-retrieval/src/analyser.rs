//! Query analyser: turns a raw question into a [`QueryPlan`] the rest of
//! the orchestrator can consume without re-parsing text.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tthc_core::intent::{context_config, Intent};
use tthc_core::traits::LlmAnalyzer;
use tthc_core::types::plan::QueryPlan;

/// Fixed Vietnamese synonym substitution table (spec §4.1): each entry is a
/// phrase plus up to two alternate phrasings. At most one substituted
/// variant is generated per table entry the question contains, and at most
/// two synonym variants total contribute to the expansion set.
const SYNONYM_TABLE: &[(&str, &[&str])] = &[
    ("đăng ký", &["đk", "ghi danh"]),
    ("giấy tờ", &["hồ sơ", "tài liệu"]),
];

fn procedure_code_pattern() -> &'static Regex {
    use std::sync::OnceLock;
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d+\.\d{5,7}\b").expect("static regex is valid"))
}

/// Generate up to two synonym-substituted variants of `question`.
fn synonym_variants(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    let mut variants = Vec::new();

    for (phrase, alternates) in SYNONYM_TABLE {
        if variants.len() >= 2 {
            break;
        }
        if let Some(position) = lower.find(phrase) {
            if let Some(alternate) = alternates.first() {
                let mut variant = String::with_capacity(question.len());
                variant.push_str(&question[..position]);
                variant.push_str(alternate);
                variant.push_str(&question[position + phrase.len()..]);
                variants.push(variant);
            }
        }
    }

    variants
}

/// Deduplicate case-insensitively, preserving first-seen order, and cap at
/// [`QueryPlan::MAX_EXPANSIONS`].
fn dedup_and_cap(expansions: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for expansion in expansions {
        let key = expansion.to_lowercase();
        if seen.insert(key) {
            result.push(expansion);
        }
        if result.len() >= QueryPlan::MAX_EXPANSIONS {
            break;
        }
    }
    result
}

/// Converts raw questions into query plans by delegating intent
/// classification and paraphrase generation to an [`LlmAnalyzer`].
pub struct QueryAnalyser {
    llm: Arc<dyn LlmAnalyzer>,
    timeout: Duration,
}

impl QueryAnalyser {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmAnalyzer>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Build a query plan for `question`. Never fails: an LLM error or
    /// timeout is swallowed and the fallback plan (`overview`, confidence
    /// 0, `expansions = [raw_question]`) is returned instead, per spec
    /// §4.1's "Failure" clause.
    pub async fn analyse(&self, question: &str) -> QueryPlan {
        let classified = tokio::time::timeout(self.timeout, self.llm.classify_intent(question)).await;
        let (intent, confidence) = match classified {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                tracing::warn!(%error, "intent classification failed, falling back to overview");
                return QueryPlan::fallback(question);
            }
            Err(_) => {
                tracing::warn!("intent classification timed out, falling back to overview");
                return QueryPlan::fallback(question);
            }
        };

        let detected_procedure_code = procedure_code_pattern()
            .find(question)
            .map(|m| m.as_str().to_string());

        let paraphrased = tokio::time::timeout(self.timeout, self.llm.paraphrase(question, 3)).await;
        let paraphrases = match paraphrased {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                tracing::warn!(%error, "paraphrase generation failed, continuing without it");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("paraphrase generation timed out, continuing without it");
                Vec::new()
            }
        };

        let mut expansions = vec![question.to_string()];
        expansions.extend(paraphrases.into_iter().take(3));
        expansions.extend(synonym_variants(question));
        let expansions = dedup_and_cap(expansions);

        QueryPlan {
            raw_question: question.to_string(),
            intent,
            intent_confidence: confidence,
            expansions,
            detected_procedure_code,
            context_config: context_config(intent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tthc_core::traits::LlmAnalyzer as _;

    struct StubAnalyzer {
        intent: Intent,
        paraphrases: Vec<String>,
    }

    #[async_trait]
    impl LlmAnalyzer for StubAnalyzer {
        async fn classify_intent(&self, _question: &str) -> anyhow::Result<(Intent, f32)> {
            Ok((self.intent, 0.9))
        }

        async fn paraphrase(&self, _question: &str, n: usize) -> anyhow::Result<Vec<String>> {
            Ok(self.paraphrases.iter().take(n).cloned().collect())
        }
    }

    #[tokio::test]
    async fn detects_procedure_code() {
        let analyser = QueryAnalyser::new(
            Arc::new(StubAnalyzer {
                intent: Intent::Documents,
                paraphrases: vec![],
            }),
            Duration::from_secs(5),
        );
        let plan = analyser.analyse("Thủ tục 1.013124 cần giấy tờ gì?").await;
        assert_eq!(plan.detected_procedure_code.as_deref(), Some("1.013124"));
    }

    #[tokio::test]
    async fn expansions_are_capped_and_deduplicated() {
        let analyser = QueryAnalyser::new(
            Arc::new(StubAnalyzer {
                intent: Intent::Overview,
                paraphrases: vec![
                    "Đăng ký kết hôn cần giấy tờ gì?".to_string(),
                    "đăng ký kết hôn cần giấy tờ gì?".to_string(),
                    "Cần chuẩn bị gì để đăng ký kết hôn?".to_string(),
                ],
            }),
            Duration::from_secs(5),
        );
        let plan = analyser.analyse("Đăng ký kết hôn cần giấy tờ gì?").await;
        assert!(plan.expansions.len() <= QueryPlan::MAX_EXPANSIONS);
        let lowered: Vec<String> = plan.expansions.iter().map(|e| e.to_lowercase()).collect();
        let unique: std::collections::HashSet<_> = lowered.iter().collect();
        assert_eq!(unique.len(), lowered.len());
    }

    #[tokio::test]
    async fn synonym_table_substitutes_first_alternate() {
        let variants = synonym_variants("Cần giấy tờ gì để đăng ký kết hôn?");
        assert!(variants.iter().any(|v| v.contains("hồ sơ")));
        assert!(variants.iter().any(|v| v.contains("đk")));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_overview() {
        struct FailingAnalyzer;
        #[async_trait]
        impl LlmAnalyzer for FailingAnalyzer {
            async fn classify_intent(&self, _question: &str) -> anyhow::Result<(Intent, f32)> {
                anyhow::bail!("provider unreachable")
            }
            async fn paraphrase(&self, _question: &str, _n: usize) -> anyhow::Result<Vec<String>> {
                Ok(vec![])
            }
        }

        let analyser = QueryAnalyser::new(Arc::new(FailingAnalyzer), Duration::from_secs(5));
        let plan = analyser.analyse("Xin chào").await;
        assert_eq!(plan.intent, Intent::fallback());
        assert_eq!(plan.intent_confidence, 0.0);
        assert_eq!(plan.expansions, vec!["Xin chào".to_string()]);
    }
}
