//! Atomic file placement.
//!
//! Bytes go to a `NamedTempFile` in the destination directory, are synced,
//! then renamed into place, so readers never observe a partial file.

use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// How to treat an existing destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Never replace; an existing file counts as success.
    WriteOnce,
    /// Atomically replace whatever is there.
    Replace,
}

/// Write `bytes` to `path` atomically. Returns `false` if a write-once
/// destination already existed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], placement: Placement) -> Result<bool> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    match placement {
        Placement::Replace => {
            temp.persist(path).map_err(|e| e.error)?;
            Ok(true)
        }
        Placement::WriteOnce => match temp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            // Lost a race against an identical write.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once_keeps_first_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");

        assert!(write_atomic(&path, b"first", Placement::WriteOnce).unwrap());
        assert!(!write_atomic(&path, b"second", Placement::WriteOnce).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_replace_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("manifest.json");

        write_atomic(&path, b"v1", Placement::Replace).unwrap();
        write_atomic(&path, b"v2", Placement::Replace).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"v2");

        // No temp files left behind.
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
