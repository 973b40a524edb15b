//! Command-line library for exercising the retrieval core locally, against
//! either the built-in sample corpus or a JSON corpus file on disk.

pub mod cli;
pub mod commands;
pub mod world;

pub use cli::OutputFormat;
