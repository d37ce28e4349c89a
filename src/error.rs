//! Error types for the crown pipelines and the command-line front end.
//!
//! Geometry never fails: degenerate crowns produce zero scores. Errors only come from
//! configuration, the worker pool, and input/output.

/// Errors surfaced by [`crate::pipeline`] and [`crate::parallel_pipeline`].
#[derive(Debug, thiserror::Error)]
pub enum CrownError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cluster {0} has no points")]
    EmptyCluster(u64),

    #[error("Failed to send task to worker pool")]
    WorkerSend,

    #[error("Failed to receive result from worker")]
    WorkerReceive,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrownError>;
