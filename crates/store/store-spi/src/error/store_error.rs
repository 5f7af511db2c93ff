//! Store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a model repository
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure on a blob or the index
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored blob exists but cannot be decoded
    #[error("Persisted model '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    /// A source name that cannot safely name a blob
    #[error("Invalid source name '{name}': {reason}")]
    InvalidSource { name: String, reason: String },

    /// A record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short taxonomy label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "IoError",
            StoreError::Corrupt { .. } => "PersistenceError",
            StoreError::InvalidSource { .. } => "UsageError",
            StoreError::Serialization(_) => "SerializationError",
        }
    }
}
