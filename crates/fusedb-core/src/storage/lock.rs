use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::StorageError;

/// A file-based advisory lock (`flock(2)` on Unix) guarding a database
/// directory against a second process.
///
/// The lock is released automatically when this struct is dropped (the
/// underlying file descriptor is closed).
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Acquire an exclusive lock on the file at `path` without blocking.
    ///
    /// Creates the lock file if it does not exist. Returns
    /// `StorageError::FileLocked` if another process holds the lock.
    pub fn try_exclusive(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        file.try_lock_exclusive()
            .map_err(|_| StorageError::FileLocked)?;

        Ok(Self { _file: file })
    }
}
