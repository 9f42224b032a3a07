use std::path::PathBuf;

use thiserror::Error;

use crate::event::Geometry;

/// Startup failures while reading or validating accumulation parameters.
/// All of these are fatal: the pipeline never runs with a bad config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read parameter file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or a missing field.
    #[error("malformed parameter document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown {field} value `{value}`")]
    UnknownVariant { field: &'static str, value: String },

    #[error("invalid parameter {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SliceError {
    #[error("event at {timestamp}us precedes last accepted event at {last}us")]
    OutOfOrder { timestamp: i64, last: i64 },

    #[error("time window must be at least one microsecond")]
    EmptyWindow,

    #[error("event count per slice must be non-zero")]
    EmptyCount,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Slice(#[from] SliceError),

    #[error("batch declares empty geometry {0}")]
    EmptyGeometry(Geometry),

    #[error("batch geometry {got} does not match stream geometry {expected}")]
    GeometryMismatch { expected: Geometry, got: Geometry },

    #[error("processing thread already running")]
    AlreadyRunning,

    #[error("failed to spawn processing thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("processing thread panicked")]
    WorkerPanicked,

    /// The worker state did not come back from a failed spawn or a panic.
    #[error("processing state lost, pipeline cannot be restarted")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read event file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}
