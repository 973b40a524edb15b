//! `ask` subcommand: run the full pipeline once and print the result.

use anyhow::Result;
use tthc_retrieval::RetrievalOrchestrator;

use crate::cli::OutputFormat;

/// Run `question` through `orchestrator` under `session_id` and print the
/// result in `output` format.
///
/// # Errors
///
/// Returns an error if the request times out, is cancelled, or JSON
/// serialization fails.
pub async fn run(orchestrator: &RetrievalOrchestrator, session_id: &str, question: &str, output: OutputFormat) -> Result<()> {
    let result = orchestrator.retrieve_simple(session_id, question).await?;

    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("intent: {:?} (confidence {:.2})", result.intent, result.plan.intent_confidence);
            if result.metadata.exact_code_fast_path {
                println!("matched exact procedure code");
            }
            if result.metadata.cache_hit {
                println!("served from cache");
            }
            if result.metadata.no_channels {
                println!("both retrieval channels failed; no information available");
            } else if result.metadata.degraded {
                println!("one retrieval channel failed; result may be incomplete");
            }
            println!("confidence: {:.3}", result.confidence);
            println!("elapsed: {}ms", result.metadata.elapsed_ms);
            println!();
            println!("{}", result.context_text);
        }
    }

    Ok(())
}
