//! Snapshot error types

use std::path::PathBuf;
use thiserror::Error;

use immom::error::ImmError;

/// Error loading, validating or saving a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file could not be written.
    #[error("failed to write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension names no known format.
    #[error("unsupported snapshot format {}, expected .json, .yaml or .yml", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML snapshot: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The snapshot parsed but its content was rejected by the repository.
    #[error("snapshot rejected: {0}")]
    Rejected(#[from] ImmError),
}

impl SnapshotError {
    /// Check if the snapshot content (rather than file access) is at fault.
    #[must_use]
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            SnapshotError::Json(_) | SnapshotError::Yaml(_) | SnapshotError::Rejected(_)
        )
    }
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
