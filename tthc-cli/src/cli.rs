//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format shared by every subcommand that prints structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Trace verbosity, independent of `RUST_LOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum TraceLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<TraceLevel> for tracing::Level {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off | TraceLevel::Error => tracing::Level::ERROR,
            TraceLevel::Warn => tracing::Level::WARN,
            TraceLevel::Info => tracing::Level::INFO,
            TraceLevel::Debug => tracing::Level::DEBUG,
            TraceLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Local exercising harness for the Vietnamese administrative-procedure
/// retrieval core.
#[derive(Parser, Debug)]
#[command(name = "retrieval-core")]
#[command(version)]
#[command(about = "Run the retrieval pipeline against a chunk corpus from the command line")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a `retrieval-core.toml` config file. Falls back to
    /// discovery (`RetrievalCoreConfig::discover`) if omitted.
    #[arg(short = 'c', long, global = true, env = "RETRIEVAL_CORE_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Path to a JSON chunk corpus file. Falls back to the built-in
    /// sample corpus (three procedures) if omitted.
    #[arg(long, global = true)]
    pub corpus: Option<PathBuf>,

    /// Trace verbosity, overridden by `RUST_LOG` if set.
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub trace: TraceLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a question and print the assembled context.
    Ask {
        /// The question, in Vietnamese.
        question: String,
        /// Session id used for cancellation/logging correlation.
        #[arg(long, default_value = "cli-session")]
        session: String,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
    /// Print the active configuration snapshot.
    Config {
        #[arg(long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
}
