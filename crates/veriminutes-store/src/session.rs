//! Session directories: per-meeting artifacts plus a manifest.
//!
//! ```text
//! <output>/<slug>/
//!   manifest.json
//!   minutes.json, transcript.json, minutes.packet.json, ...
//!   cas/sha256/<hex>
//!   cas/blake3/<hex>
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};
use veriminutes_core::{stamp, ArtifactKind, Manifest, ManifestEntry};

use crate::atomic::{write_atomic, Placement};
use crate::error::{Result, StoreError};
use crate::fs::FsStore;

/// Manifest file name inside a session.
pub const MANIFEST_FILE: &str = "manifest.json";

/// CAS directory name inside a session.
pub const CAS_DIR: &str = "cas";

/// Build a session slug: `<date>` or `<date>-<title-slug>`.
///
/// The title keeps lowercase ASCII letters and digits; every other run of
/// characters collapses into one `-`.
pub fn slugify(date: NaiveDate, title: Option<&str>) -> String {
    let date = date.format("%Y-%m-%d").to_string();
    let title_slug = title.map(|t| {
        let mut slug = String::with_capacity(t.len());
        for c in t.to_lowercase().chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                slug.push(c);
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.trim_matches('-').to_string()
    });

    match title_slug {
        Some(t) if !t.is_empty() => format!("{}-{}", date, t),
        _ => date,
    }
}

/// Root of all session directories.
#[derive(Debug, Clone)]
pub struct SessionStore {
    output_dir: PathBuf,
}

impl SessionStore {
    /// Open (and create) the output directory.
    pub fn open(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory for `slug`, created with its CAS subdirectories.
    pub fn session_dir(&self, slug: &str) -> Result<PathBuf> {
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.starts_with('.') {
            return Err(StoreError::InvalidData(format!("invalid session slug: {:?}", slug)));
        }
        let dir = self.output_dir.join(slug);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// The content-addressable store of a session.
    pub fn cas(&self, slug: &str) -> Result<FsStore> {
        FsStore::open(self.session_dir(slug)?.join(CAS_DIR))
    }

    /// Atomically write an artifact and record it in the manifest.
    pub fn store_artifact(
        &self,
        slug: &str,
        kind: ArtifactKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = self.artifact_path(slug, file_name)?;
        write_atomic(&path, bytes, Placement::Replace)?;
        debug!(slug, file_name, size = bytes.len(), "artifact written");

        let mut manifest = self.manifest(slug)?;
        manifest.record(ManifestEntry::for_bytes(kind, file_name, bytes), stamp::now());
        self.write_manifest(slug, &manifest)?;
        Ok(path)
    }

    /// Read an artifact's bytes.
    pub fn read_artifact(&self, slug: &str, file_name: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(slug, file_name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::ArtifactNotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The session manifest, or a fresh one if none was written yet.
    pub fn manifest(&self, slug: &str) -> Result<Manifest> {
        match self.read_artifact(slug, MANIFEST_FILE) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(StoreError::ArtifactNotFound(_)) => Ok(Manifest::new(stamp::now())),
            Err(e) => Err(e),
        }
    }

    /// Merge `manifest` into the session manifest and persist it.
    pub fn merge_manifest(&self, slug: &str, manifest: Manifest) -> Result<Manifest> {
        let mut current = self.manifest(slug)?;
        current.merge(manifest);
        self.write_manifest(slug, &current)?;
        Ok(current)
    }

    fn write_manifest(&self, slug: &str, manifest: &Manifest) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.artifact_path(slug, MANIFEST_FILE)?, &bytes, Placement::Replace)?;
        Ok(())
    }

    /// All session slugs, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    sessions.push(name.to_string());
                }
            }
        }
        sessions.sort();
        info!(count = sessions.len(), "listed sessions");
        Ok(sessions)
    }

    fn artifact_path(&self, slug: &str, file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(StoreError::InvalidData(format!(
                "invalid artifact name: {:?}",
                file_name
            )));
        }
        Ok(self.session_dir(slug)?.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BlobStore;
    use veriminutes_core::HashAlgorithm;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 12).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify(date(), None), "2025-09-12");
        assert_eq!(slugify(date(), Some("Q3 Board")), "2025-09-12-q3-board");
        assert_eq!(slugify(date(), Some("  Budget & Plans!! ")), "2025-09-12-budget-plans");
        assert_eq!(slugify(date(), Some("!!!")), "2025-09-12");
    }

    #[test]
    fn test_store_artifact_updates_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::open(dir.path()).unwrap();
        let slug = slugify(date(), Some("Q3 Board"));

        sessions
            .store_artifact(&slug, ArtifactKind::Minutes, "minutes.json", b"{}")
            .unwrap();
        sessions
            .store_artifact(&slug, ArtifactKind::Minutes, "minutes.json", b"{\"a\":1}")
            .unwrap();

        let manifest = sessions.manifest(&slug).unwrap();
        assert_eq!(manifest.artifacts.len(), 1);
        assert_eq!(manifest.find("minutes.json").unwrap().size, 7);
        assert_eq!(sessions.read_artifact(&slug, "minutes.json").unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn test_session_cas_layout() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::open(dir.path()).unwrap();
        let cas = sessions.cas("2025-09-12").unwrap();
        let d = cas.put(HashAlgorithm::Sha256, b"abc").unwrap();

        assert!(dir
            .path()
            .join("2025-09-12/cas/sha256")
            .join(d.to_hex())
            .is_file());
        assert!(dir.path().join("2025-09-12/cas/blake3").is_dir());
    }

    #[test]
    fn test_missing_artifact_and_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::open(dir.path()).unwrap();
        assert!(matches!(
            sessions.read_artifact("s", "minutes.json"),
            Err(StoreError::ArtifactNotFound(_))
        ));
        assert!(sessions.read_artifact("s", "../etc").is_err());
        assert!(sessions.session_dir("../escape").is_err());
    }

    #[test]
    fn test_list_sessions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::open(dir.path()).unwrap();
        sessions.session_dir("2025-09-13").unwrap();
        sessions.session_dir("2025-09-12-q3").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();

        assert_eq!(
            sessions.list_sessions().unwrap(),
            vec!["2025-09-12-q3".to_string(), "2025-09-13".to_string()]
        );
    }
}
