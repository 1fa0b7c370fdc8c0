//! Advisory run lock on `<temp root>/.lock`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{io_err, RunError};

/// Lock marker file name inside a run's temp root.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Exclusive lock guard. Released by [`RunLock::release`] or on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Create the marker if needed and take the lock without blocking.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, RunError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "acquired run lock");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(RunError::Locked { path })
            }
            Err(e) => Err(io_err(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) -> Result<(), RunError> {
        FileExt::unlock(&self.file).map_err(|e| io_err(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "released run lock");
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// `true` when some live run holds the lock at `path`. Checking never
/// creates the marker.
pub fn is_locked(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(e) => e.kind() == fs2::lock_contended_error().kind(),
    }
}
