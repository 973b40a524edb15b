//! Ensemble reranker (spec §4.5): combines normalised dense and lexical
//! scores with a raw cross-encoder score into a single final score.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tthc_config::EnsembleWeights;
use tthc_core::traits::Reranker;

/// One fused candidate on its way into reranking: the text the
/// cross-encoder will see, plus its dense and lexical scores from Stage 6
/// (zero if the candidate didn't appear in that channel's ranked list).
pub struct RerankCandidate {
    pub chunk_id: String,
    pub text: String,
    pub dense_score: f32,
    pub lex_score: f32,
}

fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !(max > min) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Scores candidates by the weighted ensemble `w_dense * dense_norm +
/// w_lex * lex_norm + w_ce * ce_score`, normalising weights to sum to 1
/// first and skipping the cross-encoder call entirely when `w_ce` is
/// effectively zero.
pub struct EnsembleReranker {
    reranker: Arc<dyn Reranker>,
    weights: EnsembleWeights,
    timeout: Duration,
}

impl EnsembleReranker {
    #[must_use]
    pub fn new(reranker: Arc<dyn Reranker>, mut weights: EnsembleWeights, timeout: Duration) -> Self {
        weights.normalize();
        Self {
            reranker,
            weights,
            timeout,
        }
    }

    /// Score every candidate against `query`. Returns `(chunk_id,
    /// final_score)` pairs in the same order as `candidates`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-encoder call fails; callers should
    /// fall back to the pre-rerank (fused) order on error, per spec §4.7's
    /// Stage 7 failure semantics.
    pub async fn score_all(&self, query: &str, candidates: &[RerankCandidate]) -> Result<Vec<(String, f32)>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let dense: Vec<f32> = candidates.iter().map(|c| c.dense_score).collect();
        let lex: Vec<f32> = candidates.iter().map(|c| c.lex_score).collect();
        let dense_norm = min_max_normalize(&dense);
        let lex_norm = min_max_normalize(&lex);

        let ce_scores = if self.weights.cross_encoder_disabled() {
            vec![0.0; candidates.len()]
        } else {
            let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
            tokio::time::timeout(self.timeout, self.reranker.score(query, &texts))
                .await
                .map_err(|_| anyhow::anyhow!("cross-encoder reranker timed out"))??
        };

        let results = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let final_score = self.weights.w_dense * dense_norm[index]
                    + self.weights.w_lex * lex_norm[index]
                    + self.weights.w_ce * ce_scores[index];
                (candidate.chunk_id.clone(), final_score)
            })
            .collect();

        Ok(results)
    }
}
