//! The nine-stage retrieval pipeline (spec §4.7): cache probe, query
//! analysis, exact-code fast path, dense parent/child retrieval, lexical
//! augmentation, reciprocal rank fusion, ensemble reranking, context
//! assembly, and cache store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tthc_config::RetrievalCoreConfig;
use tthc_core::error::RetrievalError;
use tthc_core::prelude::*;
use tthc_core::traits::VectorFilter;

use crate::analyser::QueryAnalyser;
use crate::assembler::ContextAssembler;
use crate::cache::SemanticCache;
use crate::ensemble::{EnsembleReranker, RerankCandidate};
use crate::rrf::{reciprocal_rank_fusion, remove_near_duplicates, RankedList};

/// Upper bound on how many fused candidates are sent to the reranker,
/// independent of `config.rerank_top_k_cap` (spec §4.7 Stage 7).
const RERANK_CANDIDATE_POOL: usize = 50;

/// Wires the chunk store, lexical index, vector store and model-backed
/// collaborators together into the full pipeline. Built once at startup
/// and shared (behind an `Arc`) by every request.
pub struct RetrievalOrchestrator {
    chunk_store: Arc<dyn ChunkStore>,
    lexical: Arc<dyn LexicalIndex>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    analyser: QueryAnalyser,
    ensemble: EnsembleReranker,
    cache: SemanticCache,
    config: RetrievalCoreConfig,
}

struct ExpansionOutcome {
    parent_hits: Vec<(String, f32)>,
    child_hits: Vec<(String, f32)>,
    channel_ok: bool,
}

struct DenseFanout {
    /// Best score per chunk_id across every expansion's parent search.
    parent_hits: HashMap<String, f32>,
    /// Best score per chunk_id across every expansion's child search.
    child_hits: HashMap<String, f32>,
    /// Procedures represented among `parent_hits` (set `P` in the spec).
    parent_procedures: HashSet<String>,
    /// True once at least one expansion's vector-store call succeeded.
    channel_ok: bool,
}

impl RetrievalOrchestrator {
    #[must_use]
    pub fn new(
        chunk_store: Arc<dyn ChunkStore>,
        lexical: Arc<dyn LexicalIndex>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmAnalyzer>,
        reranker: Arc<dyn Reranker>,
        config: RetrievalCoreConfig,
    ) -> Self {
        let analyser = QueryAnalyser::new(llm, Duration::from_secs(config.timeouts.llm_secs));
        let ensemble = EnsembleReranker::new(
            reranker,
            config.ensemble_weights,
            Duration::from_secs(config.timeouts.reranker_secs),
        );
        let cache = SemanticCache::new(config.cache_max_size, config.cache_ttl(), config.sim_threshold);
        Self {
            chunk_store,
            lexical,
            vector_store,
            embedder,
            analyser,
            ensemble,
            cache,
            config,
        }
    }

    /// Run the full pipeline for `question` within `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::Timeout` if the overall deadline
    /// (`config.timeouts.overall_secs`) elapses, or `RetrievalError::Cancelled`
    /// if `cancellation` fires before the request completes. A degraded or
    /// no-channels result is still `Ok`, flagged via `metadata`.
    pub async fn retrieve(
        &self,
        session_id: &str,
        question: &str,
        cancellation: CancellationToken,
    ) -> tthc_core::error::Result<RetrievalResult> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let overall_timeout = Duration::from_secs(self.config.timeouts.overall_secs);

        tokio::select! {
            () = cancellation.cancelled() => Err(RetrievalError::Cancelled {
                session_id: session_id.to_string(),
                request_id,
            }),
            outcome = tokio::time::timeout(overall_timeout, self.run(question, &cancellation)) => {
                match outcome {
                    Ok(mut result) => {
                        result.metadata.elapsed_ms = started.elapsed().as_millis() as u64;
                        Ok(result)
                    }
                    Err(_elapsed) => Err(RetrievalError::Timeout {
                        session_id: session_id.to_string(),
                        request_id,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }),
                }
            }
        }
    }

    /// Convenience wrapper for callers that don't need cooperative
    /// cancellation (the CLI, tests).
    ///
    /// # Errors
    ///
    /// Same as [`Self::retrieve`].
    pub async fn retrieve_simple(&self, session_id: &str, question: &str) -> tthc_core::error::Result<RetrievalResult> {
        self.retrieve(session_id, question, CancellationToken::new()).await
    }

    async fn run(&self, question: &str, cancellation: &CancellationToken) -> RetrievalResult {
        // Stage 0: embed the question once; reused below for the cache
        // probe and, in Stage 3, for whichever expansion equals the raw
        // question, instead of embedding it again.
        let embedder_timeout = Duration::from_secs(self.config.timeouts.embedder_secs);
        let question_embedding = match tokio::time::timeout(embedder_timeout, self.embedder.embed(question)).await {
            Ok(Ok(embedding)) => Some(embedding),
            _ => None,
        };

        if let Some(ref embedding) = question_embedding {
            if let Some(cached) = self.cache.get(question, embedding) {
                let mut hit = cached;
                hit.metadata.cache_hit = true;
                return hit;
            }
        }

        // Stage 1: query analysis.
        let plan = self.analyser.analyse(question).await;

        // Stage 2: exact procedure-code fast path.
        if let Some(code) = plan.detected_procedure_code.clone() {
            if let Ok(chunks) = self.chunk_store.by_procedure(&code) {
                if !chunks.is_empty() {
                    let reranked: Vec<(String, f32)> =
                        chunks.iter().map(|c| (c.chunk_id.clone(), 1.0)).collect();
                    let assembler = ContextAssembler::new(self.chunk_store.as_ref(), self.config.max_chunk_tokens);
                    let assembled = assembler.assemble(&reranked, &plan.context_config);
                    let result = RetrievalResult {
                        chunks: assembled.chunks,
                        context_text: assembled.context_text,
                        confidence: 1.0,
                        intent: plan.intent,
                        plan: plan.clone(),
                        metadata: RetrievalMetadata {
                            exact_code_fast_path: true,
                            ..RetrievalMetadata::default()
                        },
                    };
                    if !cancellation.is_cancelled() {
                        if let Some(embedding) = question_embedding {
                            self.cache.put(question, embedding, result.clone());
                        }
                    }
                    return result;
                }
            }
        }

        // Stages 3-5 run concurrently: dense parent/child retrieval and
        // lexical augmentation don't depend on each other's output.
        let (dense, lexical_hits) = tokio::join!(
            self.dense_fanout(&plan, question, question_embedding.as_deref()),
            self.lexical_search(&plan)
        );

        if !dense.channel_ok && !lexical_hits_ok(&lexical_hits) {
            return RetrievalResult::no_channels(plan);
        }

        // Stage 6: reciprocal rank fusion + near-duplicate collapse.
        let mut dense_ranked: Vec<(String, f32)> = dense
            .parent_hits
            .iter()
            .chain(dense.child_hits.iter())
            .map(|(id, score)| (id.clone(), *score))
            .collect();
        dense_ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        // Parent and child hits may share a chunk id only in pathological
        // fixtures; keep the higher of the two scores.
        dedup_keep_best(&mut dense_ranked);

        let lists = [
            RankedList {
                source: Source::Dense,
                ranked: dense_ranked,
                boost: 1.0,
            },
            RankedList {
                source: Source::Lexical,
                ranked: lexical_hits.clone().unwrap_or_default(),
                boost: self.config.bm25_rrf_boost,
            },
        ];
        let fused = reciprocal_rank_fusion(&lists, self.config.rrf_k);

        let content_by_chunk_id: HashMap<String, String> = fused
            .iter()
            .filter_map(|item| {
                self.chunk_store
                    .get(&item.chunk_id)
                    .ok()
                    .map(|chunk| (item.chunk_id.clone(), chunk.content))
            })
            .collect();
        let deduped = remove_near_duplicates(fused, &content_by_chunk_id, self.config.near_duplicate_jaccard);

        // Stage 7: ensemble reranking, falling back to fused order on failure.
        let pool_size = deduped.len().min(RERANK_CANDIDATE_POOL);
        let pool = &deduped[..pool_size];
        let candidates: Vec<RerankCandidate> = pool
            .iter()
            .map(|item| RerankCandidate {
                chunk_id: item.chunk_id.clone(),
                text: content_by_chunk_id.get(&item.chunk_id).cloned().unwrap_or_default(),
                dense_score: dense.child_hits.get(&item.chunk_id).copied().unwrap_or(0.0),
                lex_score: lexical_hits
                    .as_ref()
                    .and_then(|hits| hits.iter().find(|(id, _)| id == &item.chunk_id).map(|(_, s)| *s))
                    .unwrap_or(0.0),
            })
            .collect();

        let mut reranked = match self.ensemble.score_all(question, &candidates).await {
            Ok(scores) => scores,
            Err(error) => {
                tracing::warn!(%error, "reranker failed, falling back to fused order");
                pool.iter().map(|item| (item.chunk_id.clone(), item.score)).collect()
            }
        };
        reranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let rerank_top_k = (plan.context_config.chunks * (1 + plan.context_config.max_descendants))
            .min(self.config.rerank_top_k_cap)
            .max(1);
        reranked.truncate(rerank_top_k);

        // Stage 8: context assembly.
        let degraded = !dense.channel_ok || !lexical_hits_ok(&lexical_hits);
        let assembler = ContextAssembler::new(self.chunk_store.as_ref(), self.config.max_chunk_tokens);
        let assembled = assembler.assemble(&reranked, &plan.context_config);
        let confidence = if degraded {
            assembled.mean_score * 0.9
        } else {
            assembled.mean_score
        };

        let result = RetrievalResult {
            chunks: assembled.chunks,
            context_text: assembled.context_text,
            confidence: confidence.clamp(0.0, 1.0),
            intent: plan.intent,
            plan: plan.clone(),
            metadata: RetrievalMetadata {
                degraded,
                ..RetrievalMetadata::default()
            },
        };

        // Stage 9: cache store, skipped if the request was cancelled.
        if !cancellation.is_cancelled() {
            if let Some(embedding) = question_embedding {
                self.cache.put(question, embedding, result.clone());
            }
        }

        result
    }

    /// Stages 3-4: dense parent retrieval across every expansion, then
    /// dense child retrieval with an intent-scoped chunk-type filter and a
    /// soft cross-tier penalty for candidates whose procedure wasn't among
    /// the parent hits.
    async fn dense_fanout(&self, plan: &QueryPlan, question: &str, question_embedding: Option<&[f32]>) -> DenseFanout {
        let embedder_timeout = Duration::from_secs(self.config.timeouts.embedder_secs);
        let vector_timeout = Duration::from_secs(self.config.timeouts.vector_store_secs);

        let per_expansion = plan.expansions.iter().map(|expansion| {
            // The raw question was already embedded in Stage 0 for the cache
            // probe; reuse it here instead of embedding it a second time.
            let precomputed = if expansion == question { question_embedding } else { None };
            self.search_one_expansion(expansion, plan.intent, embedder_timeout, vector_timeout, precomputed)
        });
        let outcomes = futures::future::join_all(per_expansion).await;

        let mut parent_hits: HashMap<String, f32> = HashMap::new();
        let mut child_hits: HashMap<String, f32> = HashMap::new();
        let mut channel_ok = false;

        for outcome in outcomes {
            channel_ok |= outcome.channel_ok;
            for (chunk_id, score) in outcome.parent_hits {
                let entry = parent_hits.entry(chunk_id).or_insert(f32::NEG_INFINITY);
                *entry = entry.max(score);
            }
            for (chunk_id, score) in outcome.child_hits {
                let entry = child_hits.entry(chunk_id).or_insert(f32::NEG_INFINITY);
                *entry = entry.max(score);
            }
        }

        let parent_procedures: HashSet<String> = parent_hits
            .keys()
            .filter_map(|chunk_id| self.chunk_store.get(chunk_id).ok())
            .map(|chunk| chunk.procedure_id)
            .collect();

        for (chunk_id, score) in &mut child_hits {
            let in_parent_procedures = self
                .chunk_store
                .get(chunk_id)
                .map(|chunk| parent_procedures.contains(&chunk.procedure_id))
                .unwrap_or(false);
            if !in_parent_procedures {
                *score *= self.config.cross_tier_penalty;
            }
        }

        DenseFanout {
            parent_hits,
            child_hits,
            parent_procedures,
            channel_ok,
        }
    }

    /// Embed one expansion and run its parent and child searches
    /// concurrently. One unit of work in `dense_fanout`'s per-expansion
    /// fan-out.
    async fn search_one_expansion(
        &self,
        expansion: &str,
        intent: Intent,
        embedder_timeout: Duration,
        vector_timeout: Duration,
        precomputed_embedding: Option<&[f32]>,
    ) -> ExpansionOutcome {
        let embedding = if let Some(precomputed) = precomputed_embedding {
            precomputed.to_vec()
        } else {
            match tokio::time::timeout(embedder_timeout, self.embedder.embed(expansion)).await {
                Ok(Ok(vector)) => vector,
                Ok(Err(error)) => {
                    tracing::warn!(%error, expansion, "embedding expansion failed");
                    return ExpansionOutcome {
                        parent_hits: Vec::new(),
                        child_hits: Vec::new(),
                        channel_ok: false,
                    };
                }
                Err(_) => {
                    tracing::warn!(expansion, "embedding expansion timed out");
                    return ExpansionOutcome {
                        parent_hits: Vec::new(),
                        child_hits: Vec::new(),
                        channel_ok: false,
                    };
                }
            }
        };

        let parent_filter = VectorFilter::tier(Tier::Parent);
        let child_filter = match chunk_type_filter(intent) {
            Some(types) => VectorFilter::tier_and_types(Tier::Child, types.iter().copied()),
            None => VectorFilter::tier(Tier::Child),
        };

        let (parent_result, child_result) = tokio::join!(
            tokio::time::timeout(
                vector_timeout,
                self.vector_store
                    .search(&embedding, self.config.top_k_parent, Some(&parent_filter)),
            ),
            tokio::time::timeout(
                vector_timeout,
                self.vector_store
                    .search(&embedding, self.config.top_k_child, Some(&child_filter)),
            ),
        );

        let mut channel_ok = false;
        let parent_hits = match parent_result {
            Ok(Ok(hits)) => {
                channel_ok = true;
                hits
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "parent vector search failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("parent vector search timed out");
                Vec::new()
            }
        };
        let child_hits = match child_result {
            Ok(Ok(hits)) => {
                channel_ok = true;
                hits
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "child vector search failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("child vector search timed out");
                Vec::new()
            }
        };

        ExpansionOutcome {
            parent_hits,
            child_hits,
            channel_ok,
        }
    }

    /// Stage 5: BM25 lexical augmentation over the raw question. `None`
    /// means the channel itself failed (not merely empty results).
    async fn lexical_search(&self, plan: &QueryPlan) -> Option<Vec<(String, f32)>> {
        self.lexical.bm25_search(&plan.raw_question, self.config.top_k_child).ok()
    }
}

fn lexical_hits_ok(hits: &Option<Vec<(String, f32)>>) -> bool {
    hits.is_some()
}

fn dedup_keep_best(ranked: &mut Vec<(String, f32)>) {
    let mut seen: HashMap<String, f32> = HashMap::new();
    for (id, score) in ranked.drain(..).collect::<Vec<_>>() {
        let entry = seen.entry(id).or_insert(f32::NEG_INFINITY);
        *entry = entry.max(score);
    }
    let mut rebuilt: Vec<(String, f32)> = seen.into_iter().collect();
    rebuilt.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    *ranked = rebuilt;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tthc_providers::mock::{MockEmbedder, MockLlmAnalyzer, MockReranker};
    use tthc_testing::FixtureWorld;

    struct FailingVectorStore {
        dims: usize,
    }

    #[async_trait::async_trait]
    impl VectorStore for FailingVectorStore {
        fn dimensions(&self) -> usize {
            self.dims
        }

        async fn search(
            &self,
            _query_vector: &[f32],
            _k: usize,
            _filter: Option<&VectorFilter>,
        ) -> anyhow::Result<Vec<(String, f32)>> {
            anyhow::bail!("vector store unreachable")
        }
    }

    struct FailingLexicalIndex;

    impl LexicalIndex for FailingLexicalIndex {
        fn bm25_search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<(String, f32)>> {
            anyhow::bail!("lexical index unreachable")
        }

        fn stats(&self) -> tthc_core::traits::LexicalStats {
            tthc_core::traits::LexicalStats {
                num_docs: 0,
                avg_doc_length: 0.0,
                vocab_size: 0,
                k1: 1.5,
                b: 0.75,
            }
        }
    }

    fn orchestrator_with(
        world: &FixtureWorld,
        vector_store: Arc<dyn VectorStore>,
        lexical: Arc<dyn LexicalIndex>,
    ) -> RetrievalOrchestrator {
        orchestrator_with_config(world, vector_store, lexical, RetrievalCoreConfig::default())
    }

    fn orchestrator_with_config(
        world: &FixtureWorld,
        vector_store: Arc<dyn VectorStore>,
        lexical: Arc<dyn LexicalIndex>,
        config: RetrievalCoreConfig,
    ) -> RetrievalOrchestrator {
        RetrievalOrchestrator::new(
            Arc::new(world.chunk_store.clone()),
            lexical,
            vector_store,
            Arc::new(MockEmbedder::standard()),
            Arc::new(MockLlmAnalyzer),
            Arc::new(MockReranker),
            config,
        )
    }

    #[tokio::test]
    async fn exact_procedure_code_bypasses_ranking_with_full_confidence() {
        let world = FixtureWorld::build().await.unwrap();
        let vector = Arc::new(world.vector.clone());
        let lexical = Arc::new(world.lexical.clone());
        let orchestrator = orchestrator_with(&world, vector, lexical);

        let result = orchestrator
            .retrieve_simple("s1", "Thủ tục 1.001 cần giấy tờ gì?")
            .await
            .unwrap();
        assert!(result.metadata.exact_code_fast_path);
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
        assert!(!result.chunks.is_empty());
    }

    #[tokio::test]
    async fn vector_store_failure_degrades_to_lexical_only() {
        let world = FixtureWorld::build().await.unwrap();
        let failing = Arc::new(FailingVectorStore {
            dims: world.embedder.dimensions(),
        });
        let lexical = Arc::new(world.lexical.clone());
        let orchestrator = orchestrator_with(&world, failing, lexical);

        let result = orchestrator
            .retrieve_simple("s2", "Cần giấy tờ gì để đăng ký kết hôn?")
            .await
            .unwrap();
        assert!(result.metadata.degraded);
    }

    #[tokio::test]
    async fn both_channels_failing_returns_no_channels_and_skips_cache() {
        let world = FixtureWorld::build().await.unwrap();
        let failing_vector = Arc::new(FailingVectorStore {
            dims: world.embedder.dimensions(),
        });
        let failing_lexical = Arc::new(FailingLexicalIndex);
        let orchestrator = orchestrator_with(&world, failing_vector, failing_lexical);

        let result = orchestrator.retrieve_simple("s3", "câu hỏi bất kỳ").await.unwrap();
        assert!(result.metadata.no_channels);
        assert!((result.confidence - 0.0).abs() < f32::EPSILON);
        assert_eq!(orchestrator.cache.stats().size, 0);
    }

    #[tokio::test]
    async fn cancellation_before_completion_surfaces_as_cancelled() {
        let world = FixtureWorld::build().await.unwrap();
        let vector = Arc::new(world.vector.clone());
        let lexical = Arc::new(world.lexical.clone());
        let orchestrator = orchestrator_with(&world, vector, lexical);

        let token = CancellationToken::new();
        token.cancel();
        let result = orchestrator.retrieve("s4", "Đăng ký kết hôn cần gì?", token).await;
        assert!(matches!(result, Err(RetrievalError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn cross_tier_child_hits_are_penalized_not_dropped() {
        let world = FixtureWorld::build().await.unwrap();
        let question = "Đăng ký kết hôn là thủ tục hành chính xác nhận quan hệ hôn nhân giữa hai công dân";
        let plan = QueryPlan::fallback(question);

        let mut penalized_config = RetrievalCoreConfig::default();
        penalized_config.top_k_parent = 1;
        penalized_config.cross_tier_penalty = 0.8;
        let penalized = orchestrator_with_config(
            &world,
            Arc::new(world.vector.clone()),
            Arc::new(world.lexical.clone()),
            penalized_config,
        );

        let mut unpenalized_config = RetrievalCoreConfig::default();
        unpenalized_config.top_k_parent = 1;
        unpenalized_config.cross_tier_penalty = 1.0;
        let unpenalized = orchestrator_with_config(
            &world,
            Arc::new(world.vector.clone()),
            Arc::new(world.lexical.clone()),
            unpenalized_config,
        );

        let penalized_fanout = penalized.dense_fanout(&plan, question, None).await;
        let unpenalized_fanout = unpenalized.dense_fanout(&plan, question, None).await;

        assert_eq!(penalized_fanout.parent_hits.len(), 1);
        assert!(penalized_fanout.parent_procedures.contains("1.001"));
        assert!(!penalized_fanout.parent_procedures.contains("1.002"));

        let cross_tier_chunk = "1.002-documents";
        let penalized_score = *penalized_fanout
            .child_hits
            .get(cross_tier_chunk)
            .expect("cross-procedure child must be retained, not hard-filtered");
        let unpenalized_score = *unpenalized_fanout
            .child_hits
            .get(cross_tier_chunk)
            .expect("cross-procedure child must be retained, not hard-filtered");

        assert!((penalized_score - unpenalized_score * 0.8).abs() < 1e-4);
    }

    #[tokio::test]
    async fn process_intent_keeps_a_wider_descendant_budget_than_documents() {
        let world = FixtureWorld::build().await.unwrap();
        let vector = Arc::new(world.vector.clone());
        let lexical = Arc::new(world.lexical.clone());
        let orchestrator = orchestrator_with(&world, vector, lexical);

        let result = orchestrator
            .retrieve_simple("s5", "Quy trình thực hiện đăng ký quyền sử dụng đất như thế nào?")
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::Process);
    }
}
