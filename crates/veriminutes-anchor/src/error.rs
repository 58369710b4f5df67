//! Error types for the anchor module.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while submitting or looking up anchors.
#[derive(Debug, Error)]
pub enum AnchorError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A different document is already anchored under this root.
    #[error("conflict at root {merkle_root}: anchored doc {existing}, submitted {submitted}")]
    Conflict {
        merkle_root: String,
        existing: String,
        submitted: String,
    },

    /// Registry could not be reached.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// Call did not finish within the configured timeout.
    #[error("registry call timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid data in the registry.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Blocking task failed.
    #[error("blocking task failed: {0}")]
    Join(String),

    /// Connection lock poisoned by a panicking task.
    #[error("registry lock poisoned")]
    Poisoned,
}

impl AnchorError {
    /// Whether another attempt could succeed.
    ///
    /// Conflicts and corrupt records are final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnchorError::Unavailable(_)
                | AnchorError::Timeout(_)
                | AnchorError::Database(_)
                | AnchorError::Join(_)
        )
    }
}

/// Result type for anchor operations.
pub type Result<T> = std::result::Result<T, AnchorError>;
