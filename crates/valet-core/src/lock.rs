//! Single-instance advisory lock per installation.
//!
//! The installed artifact and its backup are the only durable shared state,
//! and two concurrent orchestration runs could corrupt the current/backup
//! pair. An exclusive lock on a file next to the artifact makes the
//! "at most one concurrent install" guarantee explicit; a losing invocation
//! fails fast instead of racing.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{Result, ValetError};

/// Exclusive advisory lock over one installation, released on drop.
#[derive(Debug)]
pub struct InstanceLock {
    // Held for the lifetime of the lock; closing the handle releases it.
    _file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquires the lock at `path`, failing fast with [`ValetError::Locked`]
    /// when another instance already holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                _file: file,
                path: path.to_path_buf(),
            }),
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                Err(ValetError::Locked(path.to_path_buf()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".acme.AppImage.lock");

        let held = InstanceLock::acquire(&path).unwrap();
        let err = InstanceLock::acquire(&path).unwrap_err();
        assert!(matches!(err, ValetError::Locked(_)));

        drop(held);
        InstanceLock::acquire(&path).unwrap();
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/.app.lock");
        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(lock.path(), path);
    }
}
