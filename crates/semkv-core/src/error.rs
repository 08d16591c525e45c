use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Vector store rejected operation: {0}")]
    Store(String),

    #[error("Malformed record {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Zero-magnitude vector cannot be scored")]
    DegenerateVector,

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Failures scoped to one record or document; the surrounding batch keeps going.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Error::Embedding(_)
                | Error::MalformedRecord { .. }
                | Error::DimensionMismatch { .. }
                | Error::DegenerateVector
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
