//! Filesystem implementation of the BlobStore trait.
//!
//! Layout: `<root>/<algorithm>/<hex digest>`, one immutable file per blob.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};
use veriminutes_core::{digest, Digest, HashAlgorithm};

use crate::atomic::{write_atomic, Placement};
use crate::error::{Result, StoreError};
use crate::traits::{check_bytes, BlobStore, PutOutcome};

/// Filesystem-backed content-addressable store.
///
/// Safe for concurrent use from several threads or processes: every blob is
/// placed with a no-clobber rename and identical content always wins.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the algorithm directories.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for algorithm in HashAlgorithm::ALL {
            std::fs::create_dir_all(root.join(algorithm.as_str()))?;
        }
        Ok(Self { root })
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the blob for `digest`.
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.algorithm.as_str()).join(digest.to_hex())
    }

    fn read(&self, digest: &Digest) -> Result<Vec<u8>> {
        match std::fs::read(self.blob_path(digest)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(*digest)),
            Err(e) => Err(e.into()),
        }
    }
}

impl BlobStore for FsStore {
    fn put_with_outcome(
        &self,
        algorithm: HashAlgorithm,
        bytes: &[u8],
    ) -> Result<(Digest, PutOutcome)> {
        let digest = digest(algorithm, bytes);
        let path = self.blob_path(&digest);

        if path.exists() {
            debug!(digest = %digest, "blob already present");
            return Ok((digest, PutOutcome::AlreadyPresent));
        }

        let outcome = if write_atomic(&path, bytes, Placement::WriteOnce)? {
            debug!(digest = %digest, size = bytes.len(), "blob stored");
            PutOutcome::Stored
        } else {
            debug!(digest = %digest, "blob placed concurrently");
            PutOutcome::AlreadyPresent
        };
        Ok((digest, outcome))
    }

    fn get(&self, digest: &Digest) -> Result<Bytes> {
        let bytes = self.read(digest)?;
        check_bytes(digest, &bytes).map_err(|e| {
            warn!(path = %self.blob_path(digest).display(), error = %e, "corrupted blob");
            e
        })?;
        Ok(Bytes::from(bytes))
    }

    fn exists(&self, digest: &Digest) -> Result<bool> {
        Ok(self.blob_path(digest).is_file())
    }

    fn check_integrity(&self, digest: &Digest) -> Result<bool> {
        let bytes = self.read(digest)?;
        let intact = check_bytes(digest, &bytes).is_ok();
        if !intact {
            warn!(path = %self.blob_path(digest).display(), "CAS integrity check failed");
        }
        Ok(intact)
    }

    fn list(&self, algorithm: HashAlgorithm) -> Result<Vec<Digest>> {
        let mut digests = Vec::new();
        for entry in std::fs::read_dir(self.root.join(algorithm.as_str()))? {
            let entry = entry?;
            let name = entry.file_name();
            // Skip in-flight temp files and anything else not named by a digest.
            if let Some(digest) = name
                .to_str()
                .and_then(|n| Digest::from_hex(algorithm, n).ok())
            {
                digests.push(digest);
            }
        }
        digests.sort();
        Ok(digests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_put_get_roundtrip_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();

        let d = store.put(HashAlgorithm::Sha256, b"abc").unwrap();
        assert_eq!(
            store.blob_path(&d),
            dir.path()
                .join("sha256")
                .join("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(store.get(&d).unwrap().as_ref(), b"abc");
        assert!(store.exists(&d).unwrap());
        assert!(store.check_integrity(&d).unwrap());
    }

    #[test]
    fn test_put_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();

        let (d1, o1) = store.put_with_outcome(HashAlgorithm::Blake3, b"minutes").unwrap();
        let (d2, o2) = store.put_with_outcome(HashAlgorithm::Blake3, b"minutes").unwrap();
        assert_eq!(d1, d2);
        assert_eq!(o1, PutOutcome::Stored);
        assert_eq!(o2, PutOutcome::AlreadyPresent);
        assert_eq!(store.list(HashAlgorithm::Blake3).unwrap(), vec![d1]);
    }

    #[test]
    fn test_external_corruption_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let d = store.put(HashAlgorithm::Sha256, b"original").unwrap();

        std::fs::write(store.blob_path(&d), b"tampered").unwrap();

        assert!(!store.check_integrity(&d).unwrap());
        assert!(matches!(store.get(&d), Err(StoreError::Corrupted { .. })));
        // Not repaired.
        assert_eq!(std::fs::read(store.blob_path(&d)).unwrap(), b"tampered");
    }

    #[test]
    fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let d = digest(HashAlgorithm::Sha256, b"never stored");

        assert!(!store.exists(&d).unwrap());
        assert!(matches!(store.get(&d), Err(StoreError::NotFound(_))));
        assert!(matches!(store.check_integrity(&d), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_concurrent_identical_puts() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsStore::open(dir.path()).unwrap());
        let payload = vec![0x5au8; 200_000];

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let payload = payload.clone();
                std::thread::spawn(move || store.put_all(&payload).unwrap())
            })
            .collect();
        let pairs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(pairs.windows(2).all(|w| w[0] == w[1]));
        for algorithm in HashAlgorithm::ALL {
            let listed = store.list(algorithm).unwrap();
            assert_eq!(listed.len(), 1);
            assert!(store.check_integrity(&listed[0]).unwrap());
        }
    }
}
