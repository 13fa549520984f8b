//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Most core operations degrade instead of failing (unreadable directories are
/// treated as empty, bad patterns are dropped). This enum covers the few paths
/// where a failure is surfaced: report generation and explicit state saves.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// Represents an error that occurred when a Tokio task was joined.
    /// This is often due to a task panicking or being cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The persisted state could not be (de)serialized.
    #[error("State serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The temporary state file could not be moved over the target.
    #[error("Failed to persist state file: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// No per-user data directory could be determined on this platform.
    #[error("Could not determine a local data directory")]
    NoDataDirectory,

    /// Represents a user-initiated cancellation of an operation.
    #[error("Operation was cancelled by the user")]
    Cancelled,
}
