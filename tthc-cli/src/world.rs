//! Wires a chunk store, lexical index, vector store and mock collaborators
//! into a single [`RetrievalOrchestrator`], either from a JSON corpus file
//! on disk or from the built-in sample corpus.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tthc_config::RetrievalCoreConfig;
use tthc_core::traits::Embedder;
use tthc_core::types::chunk::Chunk;
use tthc_providers::mock::{MockEmbedder, MockLlmAnalyzer, MockReranker};
use tthc_retrieval::RetrievalOrchestrator;
use tthc_storage::{Bm25Index, InMemoryVectorStore, JsonChunkStore};
use tthc_testing::sample_corpus;

fn load_corpus(path: &Path) -> Result<Vec<Chunk>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading chunk corpus file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing chunk corpus file {}", path.display()))
}

/// Build an orchestrator backed by mock collaborators over `corpus_path`
/// (or the built-in sample corpus if `None`) and `config`.
///
/// # Errors
///
/// Returns an error if the corpus file can't be read/parsed, a chunk
/// violates a store invariant, or an embedding call fails.
pub async fn build_orchestrator(corpus_path: Option<&Path>, config: RetrievalCoreConfig) -> Result<RetrievalOrchestrator> {
    let chunks = match corpus_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading chunk corpus from file");
            load_corpus(path)?
        }
        None => {
            tracing::info!("no --corpus given, using the built-in sample corpus");
            sample_corpus()
        }
    };

    let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
    let embedder = MockEmbedder::standard();

    let mut vector = InMemoryVectorStore::new(embedder.dimensions());
    for chunk in &chunks {
        let embedding = embedder.embed(&chunk.content).await?;
        vector.upsert(
            chunk.chunk_id.clone(),
            embedding,
            chunk.tier,
            chunk.chunk_type,
            chunk.procedure_id.clone(),
        )?;
    }

    let chunk_store = JsonChunkStore::from_chunks(chunks)?;
    let lexical = Bm25Index::build(&chunk_store, &ids, config.bm25_k1, config.bm25_b);

    Ok(RetrievalOrchestrator::new(
        Arc::new(chunk_store),
        Arc::new(lexical),
        Arc::new(vector),
        Arc::new(embedder),
        Arc::new(MockLlmAnalyzer),
        Arc::new(MockReranker),
        config,
    ))
}
