// THEORY:
// A single error enum for the whole library. Every fallible public entry point
// returns `shiftwatch::Result<T>`; the binary wraps these in `anyhow` for
// user-facing context. Per-entity "no data" conditions are NOT errors and never
// appear here (they are `Option::None` in the metrics layer).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file could not be parsed as TOML.
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The frame source could not be opened. No session is started.
    #[error("could not open frame source `{source_name}`: {reason}")]
    SourceOpen { source_name: String, reason: String },

    /// The frame source failed in a way that is not a single transient frame.
    #[error("frame source `{source_name}` failed: {reason}")]
    SourceRead { source_name: String, reason: String },

    /// The source reached end-of-stream without ever producing a frame.
    #[error("frame source `{0}` produced no frames")]
    EmptySource(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The report could not be serialized.
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    /// The CSV export could not be written.
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),

    /// A per-source session task panicked or was cancelled.
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
