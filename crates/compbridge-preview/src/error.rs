//! Error types for the preview engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for preview operations.
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Errors raised on the supervising side of a preview.
///
/// Faults inside a sandbox never surface here; they travel as fault
/// messages to the error console.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The sandbox thread could not be started.
    #[error("Failed to spawn sandbox: {0}")]
    Spawn(#[source] std::io::Error),

    /// Export failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported locally by the export collaborator.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing is mounted, or the mounted output is empty.
    #[error("No rendered output to export")]
    NoOutput,

    /// Writing the exported document failed.
    #[error("Failed to write export to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
