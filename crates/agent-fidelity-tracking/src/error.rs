//! Error types for drift tracking and threshold search.

use std::path::PathBuf;

use thiserror::Error;

use agent_fidelity_core::CoreError;

/// Errors raised while tracking drift or persisting snapshots.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Metric computation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A snapshot could not be written.
    #[error("failed to persist snapshot {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot serialization failed.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Log directory or report file IO failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;
