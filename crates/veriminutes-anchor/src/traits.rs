//! AnchorRegistry trait: the capability interface for ledger anchoring.
//!
//! Nothing in local verification depends on an implementation of this
//! trait being present.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use veriminutes_core::{AnchorReceipt, Sha256Hash};

use crate::error::Result;

/// What gets anchored: a Merkle root bound to the document it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRequest {
    pub merkle_root: Sha256Hash,
    pub doc_hash: Sha256Hash,
    pub schema_id: String,
    pub uri: String,
}

/// A record as stored by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRecord {
    pub doc_hash: Sha256Hash,
    pub schema_id: String,
    pub uri: String,
    pub timestamp: DateTime<Utc>,
    pub submitter: String,
}

/// The AnchorRegistry trait: async interface to an anchoring ledger.
///
/// # Design Notes
///
/// - **Idempotent submits**: submitting the same root and document hash
///   twice returns the original receipt.
/// - **Conflict detection**: a different document hash under an anchored
///   root is [`AnchorError::Conflict`](crate::AnchorError::Conflict).
/// - **No retries**: implementations make one attempt per call; bounded
///   retries live in [`AnchorClient`](crate::AnchorClient).
#[async_trait]
pub trait AnchorRegistry: Send + Sync {
    /// Identifier recorded in receipts.
    fn registry_id(&self) -> String;

    /// Record `request.merkle_root`.
    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<AnchorReceipt>;

    /// Look up the record for a root.
    async fn get_anchor(&self, merkle_root: &Sha256Hash) -> Result<Option<AnchorRecord>>;
}

/// Registry transaction reference: BLAKE3 over root, document hash and sequence.
pub fn tx_ref(merkle_root: &Sha256Hash, doc_hash: &Sha256Hash, sequence: u64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(merkle_root.as_bytes());
    hasher.update(doc_hash.as_bytes());
    hasher.update(&sequence.to_be_bytes());
    hex::encode(hasher.finalize().as_bytes())
}
