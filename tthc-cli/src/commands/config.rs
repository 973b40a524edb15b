//! `config` subcommand: print the active tunables.

use anyhow::Result;
use tthc_config::RetrievalCoreConfig;

use crate::cli::OutputFormat;

/// Print `config`'s snapshot in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(config: &RetrievalCoreConfig, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config.snapshot())?);
        }
        OutputFormat::Text => {
            println!("sim_threshold: {}", config.sim_threshold);
            println!("cache_max_size: {}", config.cache_max_size);
            println!("cache_ttl_hours: {}", config.cache_ttl_hours);
            println!("bm25_k1: {}, bm25_b: {}", config.bm25_k1, config.bm25_b);
            println!("cross_tier_penalty: {}", config.cross_tier_penalty);
            println!("top_k_parent: {}, top_k_child: {}", config.top_k_parent, config.top_k_child);
            println!("rrf_k: {}, bm25_rrf_boost: {}", config.rrf_k, config.bm25_rrf_boost);
            println!("near_duplicate_jaccard: {}", config.near_duplicate_jaccard);
            println!(
                "ensemble_weights: dense={} lex={} ce={}",
                config.ensemble_weights.w_dense, config.ensemble_weights.w_lex, config.ensemble_weights.w_ce
            );
            println!(
                "timeouts: embedder={}s vector_store={}s llm={}s reranker={}s overall={}s",
                config.timeouts.embedder_secs,
                config.timeouts.vector_store_secs,
                config.timeouts.llm_secs,
                config.timeouts.reranker_secs,
                config.timeouts.overall_secs,
            );
        }
    }
    Ok(())
}
