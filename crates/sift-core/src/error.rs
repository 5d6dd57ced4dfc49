use thiserror::Error;

/// Top-level error type for the Sift search core.
///
/// Construction-time failures (`ModelLoad`, `UnsupportedBackend`) fail fast.
/// Per-call failures (`DimensionMismatch`, `InvalidQuery`, `InvalidVector`)
/// reject only the call that raised them and never leave a partial write
/// behind. Nothing in this workspace retries on any of these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SiftError {
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Unsupported embedding backend: {0}")]
    UnsupportedBackend(String),

    #[error("Dimension mismatch: expected {expected}, received {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Storage error: {0}")]
    StorageIo(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for SiftError {
    fn from(err: toml::de::Error) -> Self {
        SiftError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SiftError {
    fn from(err: toml::ser::Error) -> Self {
        SiftError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;
