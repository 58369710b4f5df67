//! In-memory implementation of the BlobStore trait.
//!
//! Same semantics as [`FsStore`](crate::FsStore) with no persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use bytes::Bytes;
use veriminutes_core::{digest, Digest, HashAlgorithm};

use crate::error::{Result, StoreError};
use crate::traits::{check_bytes, BlobStore, PutOutcome};

/// In-memory blob store. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<BTreeMap<Digest, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bytes filed under `digest` without re-addressing them.
    ///
    /// Simulates on-disk corruption for tests and tamper demonstrations.
    pub fn overwrite_unchecked(&self, digest: Digest, bytes: impl Into<Bytes>) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Poisoned)?;
        blobs.insert(digest, bytes.into());
        Ok(())
    }

    fn lookup(&self, digest: &Digest) -> Result<Bytes> {
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        blobs
            .get(digest)
            .cloned()
            .ok_or(StoreError::NotFound(*digest))
    }
}

impl BlobStore for MemoryStore {
    fn put_with_outcome(
        &self,
        algorithm: HashAlgorithm,
        bytes: &[u8],
    ) -> Result<(Digest, PutOutcome)> {
        let digest = digest(algorithm, bytes);
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Poisoned)?;

        if blobs.contains_key(&digest) {
            return Ok((digest, PutOutcome::AlreadyPresent));
        }
        blobs.insert(digest, Bytes::copy_from_slice(bytes));
        Ok((digest, PutOutcome::Stored))
    }

    fn get(&self, digest: &Digest) -> Result<Bytes> {
        let bytes = self.lookup(digest)?;
        check_bytes(digest, &bytes)?;
        Ok(bytes)
    }

    fn exists(&self, digest: &Digest) -> Result<bool> {
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs.contains_key(digest))
    }

    fn check_integrity(&self, digest: &Digest) -> Result<bool> {
        let bytes = self.lookup(digest)?;
        Ok(check_bytes(digest, &bytes).is_ok())
    }

    fn list(&self, algorithm: HashAlgorithm) -> Result<Vec<Digest>> {
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs
            .keys()
            .filter(|d| d.algorithm == algorithm)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_put_twice_single_blob() {
        let store = MemoryStore::new();
        let d1 = store.put(HashAlgorithm::Sha256, b"abc").unwrap();
        let d2 = store.put(HashAlgorithm::Sha256, b"abc").unwrap();
        assert_eq!(d1, d2);
        assert_eq!(store.list(HashAlgorithm::Sha256).unwrap().len(), 1);
        assert!(store.list(HashAlgorithm::Blake3).unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_unchecked_is_detected() {
        let store = MemoryStore::new();
        let d = store.put(HashAlgorithm::Blake3, b"abc").unwrap();
        store.overwrite_unchecked(d, &b"abd"[..]).unwrap();

        assert!(!store.check_integrity(&d).unwrap());
        assert!(matches!(store.get(&d), Err(StoreError::Corrupted { .. })));
    }

    proptest! {
        #[test]
        fn content_addressing_holds(blob in prop::collection::vec(any::<u8>(), 0..2048)) {
            let store = MemoryStore::new();
            let pair = store.put_all(&blob).unwrap();
            for algorithm in HashAlgorithm::ALL {
                let d = pair.get(algorithm);
                let stored = store.get(&d).unwrap();
                prop_assert_eq!(digest(algorithm, &stored), d);
            }
        }
    }
}
