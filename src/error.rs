//! Error taxonomy.
//!
//! Per-record and per-batch failures never leave the pipeline (the
//! reprocessing pass owns them); only deadline expiry and configuration
//! errors reach the orchestrator, and the orchestrator contains both to a
//! per-source skip. No error from one source may terminate another's run.

use std::time::Duration;

use thiserror::Error;

/// Configuration problems, fatal at source-construction time - the source
/// is skipped before any network activity.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no config found for source '{0}' - please check your configuration")]
    MissingSource(String),

    #[error("unknown source '{0}' - not present in the registry")]
    UnknownSource(String),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Destination store failures.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure modes of one source's run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("run exceeded its {0:?} deadline budget")]
    DeadlineExceeded(Duration),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source connector error: {0}")]
    Source(#[source] anyhow::Error),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Invalid matcher invocations.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("columns_a and columns_b must have the same length ({a} vs {b})")]
    ColumnArity { a: usize, b: usize },
}
