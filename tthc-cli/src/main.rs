//! Entry point for the `retrieval-core` CLI.

use anyhow::Result;
use clap::Parser;
use tthc_cli::cli::{Cli, TraceLevel};
use tthc_cli::{commands::execute_command, world::build_orchestrator};
use tthc_config::RetrievalCoreConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.trace);

    let config = match &cli.config {
        Some(path) => RetrievalCoreConfig::load_from_file(path)?,
        None => RetrievalCoreConfig::discover()?,
    };

    let orchestrator = build_orchestrator(cli.corpus.as_deref(), config).await?;

    execute_command(cli.command, &orchestrator, &config).await
}

/// Priority: `RUST_LOG` env var > `--trace` flag. Tracing output goes to
/// stderr so a caller can redirect JSON/text output on stdout independently.
fn setup_tracing(trace_level: TraceLevel) {
    use std::io;
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::from(trace_level))
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}
