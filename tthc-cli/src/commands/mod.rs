//! Subcommand dispatch.

pub mod ask;
pub mod config;

use anyhow::Result;
use tthc_config::RetrievalCoreConfig;
use tthc_retrieval::RetrievalOrchestrator;

use crate::cli::Command;

/// Execute the selected subcommand.
///
/// # Errors
///
/// Propagates whatever the subcommand itself fails with.
pub async fn execute_command(command: Command, orchestrator: &RetrievalOrchestrator, config: &RetrievalCoreConfig) -> Result<()> {
    match command {
        Command::Ask { question, session, output } => ask::run(orchestrator, &session, &question, output).await,
        Command::Config { output } => config::run(config, output),
    }
}
