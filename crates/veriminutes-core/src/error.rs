//! Error types for VeriMinutes Core.

use thiserror::Error;

/// Core errors that can occur while building or parsing proof artifacts.
///
/// Verification outcomes (hash mismatch, bad signature, broken proof) are not
/// errors; they are reported as itemized layer results by the pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("invalid proof request: leaf index {index} out of range for {leaf_count} leaves")]
    InvalidProofRequest { index: usize, leaf_count: usize },

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
