//! HTTP-backed adapters. Each wraps a `reqwest::Client` and a
//! [`ProviderConfig`], and speaks a small JSON request/response contract —
//! intentionally generic rather than tied to one vendor's API, since the
//! spec treats the embedder/LLM/reranker as interchangeable collaborators.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tthc_core::intent::Intent;
use tthc_core::traits::{Embedder, LlmAnalyzer, Reranker};

use crate::config::ProviderConfig;

fn authorized(client: &reqwest::Client, config: &ProviderConfig, url: &str) -> reqwest::RequestBuilder {
    let mut request = client.post(url).timeout(config.timeout());
    if let Some(api_key) = &config.api_key {
        request = request.bearer_auth(api_key);
    }
    request
}

/// Calls an HTTP embedding service: `POST {endpoint}/embed`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: ProviderConfig,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    #[must_use]
    pub fn new(config: ProviderConfig, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embed", self.config.endpoint);
        let response = authorized(&self.client, &self.config, &url)
            .json(&EmbedRequest {
                model: &self.config.model,
                input: text,
            })
            .send()
            .await
            .with_context(|| format!("embedding request to {} failed", self.config.name))?
            .error_for_status()
            .with_context(|| format!("embedding provider {} returned an error status", self.config.name))?
            .json::<EmbedResponse>()
            .await
            .with_context(|| format!("parsing embedding response from {}", self.config.name))?;

        if response.embedding.len() != self.dimensions {
            bail!(
                "embedding provider {} returned {} dimensions, expected {}",
                self.config.name,
                response.embedding.len(),
                self.dimensions
            );
        }
        Ok(response.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Calls an HTTP LLM analysis service: `POST {endpoint}/classify-intent`
/// and `POST {endpoint}/paraphrase`.
pub struct HttpLlmAnalyzer {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    question: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    intent: String,
    confidence: f32,
}

#[derive(Serialize)]
struct ParaphraseRequest<'a> {
    model: &'a str,
    question: &'a str,
    n: usize,
}

#[derive(Deserialize)]
struct ParaphraseResponse {
    paraphrases: Vec<String>,
}

impl HttpLlmAnalyzer {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn parse_intent(raw: &str) -> Option<Intent> {
        Intent::ALL
            .into_iter()
            .find(|intent| format!("{intent:?}").eq_ignore_ascii_case(raw))
    }
}

#[async_trait]
impl LlmAnalyzer for HttpLlmAnalyzer {
    async fn classify_intent(&self, question: &str) -> Result<(Intent, f32)> {
        let url = format!("{}/classify-intent", self.config.endpoint);
        let response = authorized(&self.client, &self.config, &url)
            .json(&ClassifyRequest {
                model: &self.config.model,
                question,
            })
            .send()
            .await
            .with_context(|| format!("intent classification request to {} failed", self.config.name))?
            .error_for_status()
            .with_context(|| format!("analysis provider {} returned an error status", self.config.name))?
            .json::<ClassifyResponse>()
            .await
            .with_context(|| format!("parsing classification response from {}", self.config.name))?;

        let Some(intent) = Self::parse_intent(&response.intent) else {
            bail!(
                "analysis provider {} returned an unrecognised intent: {}",
                self.config.name,
                response.intent
            );
        };
        Ok((intent, response.confidence))
    }

    async fn paraphrase(&self, question: &str, n: usize) -> Result<Vec<String>> {
        let url = format!("{}/paraphrase", self.config.endpoint);
        let response = authorized(&self.client, &self.config, &url)
            .json(&ParaphraseRequest {
                model: &self.config.model,
                question,
                n,
            })
            .send()
            .await
            .with_context(|| format!("paraphrase request to {} failed", self.config.name))?
            .error_for_status()
            .with_context(|| format!("analysis provider {} returned an error status", self.config.name))?
            .json::<ParaphraseResponse>()
            .await
            .with_context(|| format!("parsing paraphrase response from {}", self.config.name))?;

        Ok(response.paraphrases)
    }
}

/// Calls an HTTP cross-encoder reranking service: `POST {endpoint}/rerank`.
pub struct HttpReranker {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

impl HttpReranker {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.config.endpoint);
        let response = authorized(&self.client, &self.config, &url)
            .json(&RerankRequest {
                model: &self.config.model,
                query,
                texts,
            })
            .send()
            .await
            .with_context(|| format!("rerank request to {} failed", self.config.name))?
            .error_for_status()
            .with_context(|| format!("reranker provider {} returned an error status", self.config.name))?
            .json::<RerankResponse>()
            .await
            .with_context(|| format!("parsing rerank response from {}", self.config.name))?;

        if response.scores.len() != texts.len() {
            bail!(
                "reranker provider {} returned {} scores for {} texts",
                self.config.name,
                response.scores.len(),
                texts.len()
            );
        }
        Ok(response.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_intent_case_insensitively() {
        assert_eq!(HttpLlmAnalyzer::parse_intent("DOCUMENTS"), Some(Intent::Documents));
        assert_eq!(HttpLlmAnalyzer::parse_intent("overview"), Some(Intent::Overview));
    }

    #[test]
    fn rejects_unknown_intent_label() {
        assert_eq!(HttpLlmAnalyzer::parse_intent("unknown-label"), None);
    }
}
