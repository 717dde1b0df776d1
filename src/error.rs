// src/error.rs
use thiserror::Error;

/// Failure of a single pose-estimation call. Never fatal: the frame is
/// classified as "nothing detected" and processing moves on.
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("pose backend failed: {0}")]
    Backend(String),

    #[error("replay exhausted after {0} observations")]
    ReplayExhausted(usize),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("classification worker panicked or was cancelled: {0}")]
    WorkerJoin(#[from] tokio::task::JoinError),

    #[error("capture thread panicked")]
    CaptureThread,

    #[error("frame source failed: {0:#}")]
    Source(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
