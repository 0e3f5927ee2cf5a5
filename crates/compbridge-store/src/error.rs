//! Error types for the snippet store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
