//! Error types for the VeriMinutes facade.

use thiserror::Error;
use veriminutes_anchor::AnchorError;
use veriminutes_core::CoreError;
use veriminutes_store::StoreError;

/// Errors from building, persisting or loading packets.
///
/// A packet that loads but fails verification is not an error; see
/// [`VerificationResult`](crate::VerificationResult).
#[derive(Debug, Error)]
pub enum NotaryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("anchoring failed: {0}")]
    Anchor(#[from] AnchorError),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Signing key could not be loaded or created.
    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, NotaryError>;
