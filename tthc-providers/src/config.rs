//! Shared provider configuration, layered environment-variable-first the
//! same way as the retrieval core's own config (`tthc-config`), but scoped
//! per provider instance rather than to the whole process.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a single HTTP-backed provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable name, used in error messages and tracing spans.
    pub name: String,
    /// Base URL of the service.
    pub endpoint: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
    /// Model identifier sent in the request body.
    pub model: String,
    /// Per-call timeout; overridden by the orchestrator's own per-stage
    /// timeouts (§6 of the spec) but used as a fallback default here.
    pub timeout_secs: u64,
    /// Provider-specific extra fields forwarded verbatim in request bodies.
    #[serde(default)]
    pub custom_config: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Construct a config pointed at `endpoint` for `model`, with a 30s
    /// default timeout.
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            timeout_secs: 30,
            custom_config: HashMap::new(),
        }
    }

    /// Load endpoint, API key and model from `{PREFIX}_ENDPOINT`,
    /// `{PREFIX}_API_KEY` and `{PREFIX}_MODEL` environment variables.
    #[must_use]
    pub fn from_env(name: &str, env_prefix: &str) -> Option<Self> {
        let endpoint = std::env::var(format!("{env_prefix}_ENDPOINT")).ok()?;
        let model = std::env::var(format!("{env_prefix}_MODEL"))
            .unwrap_or_else(|_| "default".to_string());
        let api_key = std::env::var(format!("{env_prefix}_API_KEY")).ok();
        Some(Self {
            name: name.to_string(),
            endpoint,
            api_key,
            model,
            timeout_secs: 30,
            custom_config: HashMap::new(),
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}
