//! Signing key providers.
//!
//! Keys are injected into the [`Notary`](crate::Notary); there is no
//! process-wide key.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;
use veriminutes_core::Keypair;

use crate::error::{NotaryError, Result};

/// Source of the Ed25519 signing key.
pub trait KeyProvider: Send + Sync {
    fn keypair(&self) -> Result<Keypair>;
}

/// Raw 32-byte seed on disk, created on first use.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_seed(&self) -> Result<Keypair> {
        let bytes = std::fs::read(&self.path)?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            NotaryError::Keystore(format!(
                "{}: expected 32-byte seed, found {} bytes",
                self.path.display(),
                bytes.len()
            ))
        })?;
        Ok(Keypair::from_seed(&seed))
    }

    fn create_seed(&self) -> Result<Keypair> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Created 0600 and renamed into place only once complete.
        let keypair = Keypair::generate();
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&keypair.seed())?;
        temp.as_file().sync_all()?;

        match temp.persist_noclobber(&self.path) {
            Ok(_) => {
                info!(path = %self.path.display(), public_key = %keypair.public_key().to_hex(), "created signing key");
                Ok(keypair)
            }
            // Another process created it first.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => self.read_seed(),
            Err(e) => Err(e.error.into()),
        }
    }
}

impl KeyProvider for FileKeyProvider {
    fn keypair(&self) -> Result<Keypair> {
        match self.read_seed() {
            Err(NotaryError::Io(e)) if e.kind() == ErrorKind::NotFound => self.create_seed(),
            other => other,
        }
    }
}

/// A key held in memory.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    keypair: Keypair,
}

impl StaticKeyProvider {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn keypair(&self) -> Result<Keypair> {
        Ok(self.keypair.clone())
    }
}
