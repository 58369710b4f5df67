//! BlobStore trait: the interface for content-addressed persistence.
//!
//! A blob is filed under the digest of its own bytes, once per algorithm.
//! Writes are idempotent and content under a digest never changes.

use bytes::Bytes;
use veriminutes_core::{digest, Digest, DigestPair, HashAlgorithm};

use crate::error::{Result, StoreError};

/// Result of a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Blob was written.
    Stored,
    /// Blob was already present (idempotent, not an error).
    AlreadyPresent,
}

/// Content-addressable blob storage.
///
/// Implementations must tolerate concurrent puts of the same content.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under their `algorithm` digest.
    fn put_with_outcome(&self, algorithm: HashAlgorithm, bytes: &[u8])
        -> Result<(Digest, PutOutcome)>;

    /// Fetch a blob, re-checking its digest.
    ///
    /// Returns [`StoreError::Corrupted`] if the stored bytes no longer match.
    fn get(&self, digest: &Digest) -> Result<Bytes>;

    /// Check whether a blob is present.
    fn exists(&self, digest: &Digest) -> Result<bool>;

    /// Recompute the digest of a stored blob.
    ///
    /// `Ok(false)` means corruption; it is reported, never repaired.
    fn check_integrity(&self, digest: &Digest) -> Result<bool>;

    /// All digests stored under `algorithm`, sorted.
    fn list(&self, algorithm: HashAlgorithm) -> Result<Vec<Digest>>;

    /// Store `bytes` under their `algorithm` digest.
    fn put(&self, algorithm: HashAlgorithm, bytes: &[u8]) -> Result<Digest> {
        self.put_with_outcome(algorithm, bytes).map(|(d, _)| d)
    }

    /// Store `bytes` under both algorithms.
    fn put_all(&self, bytes: &[u8]) -> Result<DigestPair> {
        let sha256 = self.put(HashAlgorithm::Sha256, bytes)?;
        let blake3 = self.put(HashAlgorithm::Blake3, bytes)?;
        Ok(DigestPair {
            sha256: sha256.bytes.into(),
            blake3: blake3.bytes.into(),
        })
    }
}

/// Compare stored bytes against the digest they are filed under.
pub(crate) fn check_bytes(expected: &Digest, bytes: &[u8]) -> Result<()> {
    let actual = digest(expected.algorithm, bytes);
    if actual == *expected {
        Ok(())
    } else {
        Err(StoreError::Corrupted {
            algorithm: expected.algorithm,
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        })
    }
}
