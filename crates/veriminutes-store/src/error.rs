//! Error types for the store module.

use thiserror::Error;
use veriminutes_core::{CoreError, Digest, HashAlgorithm};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Blob not present under the requested digest.
    #[error("blob not found: {0}")]
    NotFound(Digest),

    /// Stored bytes no longer hash to the digest they are filed under.
    #[error("CAS corruption under {algorithm}: expected {expected}, found {actual}")]
    Corrupted {
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    },

    /// Session artifact missing.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Core error (e.g. malformed packet on disk).
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
