use std::path::PathBuf;

use tdot_core::ContractError;

/// Errors raised by the benchmark harness.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("setting {index}: {reason}")]
    InvalidConfig { index: usize, reason: String },

    #[error("tensor of shape {dims:?} needs {expected} elements, got {actual}")]
    Shape {
        dims: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("tensordot: {0}")]
    Tensordot(String),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Convenience alias for `Result<T, BenchError>`.
pub type Result<T> = std::result::Result<T, BenchError>;
