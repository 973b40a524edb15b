//! ABOUTME: Central configuration management for the retrieval core
//! ABOUTME: Handles TOML parsing, validation, and environment variable overrides

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix used for overrides.
const ENV_PREFIX: &str = "RETRIEVAL_CORE_";

/// Configuration file discovery order, checked relative to the current directory.
const CONFIG_SEARCH_PATHS: &[&str] = &[
    "retrieval-core.toml",
    ".retrieval-core.toml",
    "config/retrieval-core.toml",
];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML content could not be parsed.
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A loaded value failed validation.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Ensemble weights for the reranker (§4.5): `final = w_dense * dense_norm +
/// w_lex * lex_norm + w_ce * ce_score`. Normalised to sum to 1 if the
/// loaded values don't already.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnsembleWeights {
    /// Weight on the min-max normalised dense score.
    pub w_dense: f32,
    /// Weight on the min-max normalised lexical (BM25) score.
    pub w_lex: f32,
    /// Weight on the raw cross-encoder score.
    pub w_ce: f32,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            w_dense: 0.55,
            w_lex: 0.35,
            w_ce: 0.10,
        }
    }
}

impl EnsembleWeights {
    /// Normalise the weights in place so they sum to 1, unless they
    /// already do (within floating-point tolerance) or all three are zero.
    pub fn normalize(&mut self) {
        let sum = self.w_dense + self.w_lex + self.w_ce;
        if sum > 0.0 && (sum - 1.0).abs() > f32::EPSILON {
            self.w_dense /= sum;
            self.w_lex /= sum;
            self.w_ce /= sum;
        }
    }

    /// Whether the cross-encoder should be skipped entirely.
    #[must_use]
    pub fn cross_encoder_disabled(&self) -> bool {
        self.w_ce <= 0.0
    }
}

/// Per-call timeouts for every external collaborator, plus the overall
/// request deadline (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Embedder timeout, seconds.
    pub embedder_secs: u64,
    /// Vector store timeout, seconds.
    pub vector_store_secs: u64,
    /// Analysis LLM timeout, seconds.
    pub llm_secs: u64,
    /// Reranker timeout, seconds.
    pub reranker_secs: u64,
    /// Overall request deadline, seconds.
    pub overall_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedder_secs: 10,
            vector_store_secs: 5,
            llm_secs: 60,
            reranker_secs: 15,
            overall_secs: 180,
        }
    }
}

/// All tunables from spec §6, in one place, loadable from TOML and
/// overridable by `RETRIEVAL_CORE_*` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalCoreConfig {
    /// Cosine-similarity threshold for a semantic cache hit.
    pub sim_threshold: f32,
    /// Maximum number of entries the semantic cache holds.
    pub cache_max_size: usize,
    /// Cache entry time-to-live, in hours.
    pub cache_ttl_hours: u64,
    /// BM25 `k1`.
    pub bm25_k1: f32,
    /// BM25 `b`.
    pub bm25_b: f32,
    /// Multiplicative penalty applied to cross-tier child candidates (Stage 4).
    pub cross_tier_penalty: f32,
    /// Parent candidates fetched per expansion in Stage 3.
    pub top_k_parent: usize,
    /// Lexical candidates fetched in Stage 5.
    pub top_k_child: usize,
    /// RRF's `k` constant (Stage 6).
    pub rrf_k: u32,
    /// Per-chunk token ceiling before keep-head-and-tail truncation.
    pub max_chunk_tokens: u32,
    /// Hard cap on Stage 7's `rerank_top_k`.
    pub rerank_top_k_cap: usize,
    /// BM25 contribution multiplier during RRF (Stage 6).
    pub bm25_rrf_boost: f32,
    /// Jaccard similarity at or above which two fused candidates are
    /// treated as near-duplicates and collapsed (Stage 6).
    pub near_duplicate_jaccard: f32,
    /// Ensemble weights for the reranker.
    pub ensemble_weights: EnsembleWeights,
    /// Per-collaborator and overall timeouts.
    pub timeouts: TimeoutConfig,
}

impl Default for RetrievalCoreConfig {
    fn default() -> Self {
        Self {
            sim_threshold: 0.92,
            cache_max_size: 100,
            cache_ttl_hours: 24,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            cross_tier_penalty: 0.8,
            top_k_parent: 5,
            top_k_child: 100,
            rrf_k: 60,
            max_chunk_tokens: 1200,
            rerank_top_k_cap: 20,
            bm25_rrf_boost: 1.2,
            near_duplicate_jaccard: 0.95,
            ensemble_weights: EnsembleWeights::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl RetrievalCoreConfig {
    /// Search `CONFIG_SEARCH_PATHS` relative to the current directory and
    /// load the first one found, falling back to defaults if none exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a candidate file exists but fails to parse or
    /// validate.
    pub fn discover() -> Result<Self, ConfigError> {
        for candidate in CONFIG_SEARCH_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_file(path);
            }
        }
        debug!("no retrieval-core.toml found, using defaults + environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file, then apply
    /// environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, doesn't parse, or the
    /// resulting configuration is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML content, apply environment overrides, and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the content doesn't parse or the resulting
    /// configuration is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `RETRIEVAL_CORE_*` environment variable overrides in place.
    /// Unset or unparsable variables are left untouched.
    pub fn apply_env_overrides(&mut self) {
        macro_rules! env_override {
            ($field:expr, $suffix:literal) => {
                if let Ok(raw) = std::env::var(format!("{ENV_PREFIX}{}", $suffix)) {
                    match raw.parse() {
                        Ok(value) => {
                            debug!(var = %format!("{ENV_PREFIX}{}", $suffix), value = %raw, "overriding config from environment");
                            $field = value;
                        }
                        Err(_) => {
                            tracing::warn!(var = %format!("{ENV_PREFIX}{}", $suffix), value = %raw, "ignoring unparsable environment override");
                        }
                    }
                }
            };
        }

        env_override!(self.sim_threshold, "SIM_THRESHOLD");
        env_override!(self.cache_max_size, "CACHE_MAX_SIZE");
        env_override!(self.cache_ttl_hours, "CACHE_TTL_HOURS");
        env_override!(self.bm25_k1, "BM25_K1");
        env_override!(self.bm25_b, "BM25_B");
        env_override!(self.cross_tier_penalty, "CROSS_TIER_PENALTY");
        env_override!(self.top_k_parent, "TOP_K_PARENT");
        env_override!(self.top_k_child, "TOP_K_CHILD");
        env_override!(self.rrf_k, "RRF_K");
        env_override!(self.max_chunk_tokens, "MAX_CHUNK_TOKENS");
    }

    /// Validate the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invariant violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sim_threshold) {
            return Err(ConfigError::Validation(format!(
                "sim_threshold must be in [0, 1], got {}",
                self.sim_threshold
            )));
        }
        if self.cache_max_size == 0 {
            return Err(ConfigError::Validation(
                "cache_max_size must be > 0".to_string(),
            ));
        }
        if self.bm25_k1 < 0.0 || self.bm25_b < 0.0 || self.bm25_b > 1.0 {
            return Err(ConfigError::Validation(format!(
                "bm25_k1 ({}) must be >= 0 and bm25_b ({}) must be in [0, 1]",
                self.bm25_k1, self.bm25_b
            )));
        }
        if !(0.0..=1.0).contains(&self.cross_tier_penalty) {
            return Err(ConfigError::Validation(format!(
                "cross_tier_penalty must be in [0, 1], got {}",
                self.cross_tier_penalty
            )));
        }
        if self.top_k_parent == 0 || self.top_k_child == 0 {
            return Err(ConfigError::Validation(
                "top_k_parent and top_k_child must be > 0".to_string(),
            ));
        }
        if self.max_chunk_tokens == 0 {
            return Err(ConfigError::Validation(
                "max_chunk_tokens must be > 0".to_string(),
            ));
        }
        let w = self.ensemble_weights;
        if w.w_dense < 0.0 || w.w_lex < 0.0 || w.w_ce < 0.0 {
            return Err(ConfigError::Validation(
                "ensemble weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache TTL as a `Duration`.
    #[must_use]
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    /// Serialize every tunable to a `serde_json::Value`, for a host to
    /// expose on a debug/introspection endpoint (spec §6's `config()`).
    ///
    /// # Panics
    ///
    /// Never: every field type here round-trips through `serde_json`.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("RetrievalCoreConfig always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec() {
        let config = RetrievalCoreConfig::default();
        assert!((config.sim_threshold - 0.92).abs() < f32::EPSILON);
        assert_eq!(config.cache_max_size, 100);
        assert_eq!(config.cache_ttl_hours, 24);
        assert!((config.bm25_k1 - 1.5).abs() < f32::EPSILON);
        assert!((config.bm25_b - 0.75).abs() < f32::EPSILON);
        assert!((config.cross_tier_penalty - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.top_k_parent, 5);
        assert_eq!(config.top_k_child, 100);
        assert_eq!(config.rrf_k, 60);
        assert_eq!(config.max_chunk_tokens, 1200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ensemble_weights_normalize_when_they_dont_sum_to_one() {
        let mut weights = EnsembleWeights {
            w_dense: 1.0,
            w_lex: 1.0,
            w_ce: 0.0,
        };
        weights.normalize();
        let sum = weights.w_dense + weights.w_lex + weights.w_ce;
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((weights.w_dense - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cross_encoder_disabled_when_weight_is_zero() {
        let weights = EnsembleWeights {
            w_dense: 0.6,
            w_lex: 0.4,
            w_ce: 0.0,
        };
        assert!(weights.cross_encoder_disabled());
    }

    #[test]
    fn rejects_out_of_range_sim_threshold() {
        let config = RetrievalCoreConfig {
            sim_threshold: 1.5,
            ..RetrievalCoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let config = RetrievalCoreConfig::default();
        let snapshot = config.snapshot();
        assert_eq!(snapshot["rrf_k"], 60);
        assert_eq!(snapshot["timeouts"]["overall_secs"], 180);
    }

    #[test]
    fn from_toml_parses_a_partial_override() {
        let toml = r#"
            sim_threshold = 0.8
            cache_max_size = 50
        "#;
        let config = RetrievalCoreConfig::from_toml(toml).unwrap();
        assert!((config.sim_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.cache_max_size, 50);
        // Untouched fields keep their defaults.
        assert_eq!(config.rrf_k, 60);
    }
}
