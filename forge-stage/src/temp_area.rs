//! Run-scoped temp area: blob storage plus the staging index.
//!
//! # Layout
//!
//! ```text
//! <temp root>/
//!   index.db/            sled staging index, opened on first use
//!   <uuid>.blob          staged file content, one per live file entry
//! ```
//!
//! The area is single-use. [`TempArea::commit`] and [`TempArea::rollback`]
//! both end in disposal, after which every operation returns
//! [`StagingError::Disposed`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;
use walkdir::WalkDir;

use forge_core::paths::absolutize;
use forge_core::{inject_path, EntryKind, Variables, WriteOptions};
use forge_renderer::Injector;

use crate::error::{io_err, StagingError};
use crate::index::{Entries, EntryFilter, StagingEntry, StagingIndex};

/// Extension of every blob file, so sweeps can find them without the index.
pub const BLOB_SUFFIX: &str = "blob";

/// Directory name of the staging index inside the temp root.
pub const INDEX_DIR: &str = "index.db";

/// What a commit wrote to the target tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub directories: usize,
    pub files: usize,
    /// Staged files left untouched because they were never approved.
    pub unapproved: usize,
}

pub struct TempArea {
    root: PathBuf,
    index: Option<StagingIndex>,
    injector: Arc<dyn Injector>,
    disposed: bool,
}

impl TempArea {
    /// The root directory is created lazily together with the index.
    pub fn new(root: impl AsRef<Path>, injector: Arc<dyn Injector>) -> Self {
        Self {
            root: absolutize(root.as_ref()),
            index: None,
            injector,
            disposed: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn injector(&self) -> &Arc<dyn Injector> {
        &self.injector
    }

    fn index(&mut self) -> Result<&StagingIndex, StagingError> {
        if self.disposed {
            return Err(StagingError::Disposed);
        }
        if self.index.is_none() {
            fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
            self.index = Some(StagingIndex::open(self.root.join(INDEX_DIR))?);
        }
        self.index.as_ref().ok_or(StagingError::Disposed)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&mut self, target: &Path, kind: EntryKind) -> Result<Option<StagingEntry>, StagingError> {
        let target = absolutize(target);
        self.index()?.get(&target, kind)
    }

    pub fn entries(&mut self, filter: EntryFilter) -> Result<Entries, StagingError> {
        Ok(self.index()?.entries(filter))
    }

    /// `true` when a file or directory entry exists for `target`.
    pub fn exists(&mut self, target: &Path) -> Result<bool, StagingError> {
        let target = absolutize(target);
        let index = self.index()?;
        Ok(index.get(&target, EntryKind::File)?.is_some()
            || index.get(&target, EntryKind::Directory)?.is_some())
    }

    /// Staged content for `target`, or `None` when no file is staged there.
    pub fn read_file(&mut self, target: &Path) -> Result<Option<Vec<u8>>, StagingError> {
        let Some(entry) = self.get(target, EntryKind::File)? else {
            return Ok(None);
        };
        match entry.blob_path {
            Some(blob) => fs::read(&blob).map(Some).map_err(|e| io_err(&blob, e)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Staging writes
    // -----------------------------------------------------------------------

    /// Record `target` as a directory to create. Idempotent.
    pub fn ensure_directory(&mut self, target: &Path) -> Result<(), StagingError> {
        let target = stageable(target)?;
        let index = self.index()?;
        if index.get(&target, EntryKind::Directory)?.is_none() {
            index.upsert(&StagingEntry::directory(&target))?;
            tracing::debug!(path = %target.display(), "staged directory");
        }
        Ok(())
    }

    /// Mark the staged file at `target` approved. Returns `false` if nothing
    /// is staged there.
    pub fn approve(&mut self, target: &Path) -> Result<bool, StagingError> {
        let target = absolutize(target);
        self.index()?.set_approved(&target)
    }

    pub fn write_file(
        &mut self,
        target: &Path,
        content: &[u8],
        opts: WriteOptions,
    ) -> Result<(), StagingError> {
        self.stage_blob(target, opts, |blob| {
            fs::write(blob, content).map_err(|e| io_err(blob, e))
        })
    }

    /// Stage a byte copy of `src`.
    pub fn copy_file(&mut self, src: &Path, target: &Path, opts: WriteOptions) -> Result<(), StagingError> {
        if src.is_dir() {
            return Err(StagingError::SourceIsDirectory {
                path: src.to_path_buf(),
            });
        }
        self.stage_blob(target, opts, |blob| {
            fs::copy(src, blob).map(|_| ()).map_err(|e| io_err(src, e))
        })
    }

    /// Stage `src` rendered with `variables` under the placeholder-expanded
    /// `target`. Content the injector declines is copied verbatim. Returns
    /// the resolved target path.
    pub fn inject_file(
        &mut self,
        src: &Path,
        target: &Path,
        variables: &Variables,
        opts: WriteOptions,
    ) -> Result<PathBuf, StagingError> {
        if src.is_dir() {
            return Err(StagingError::SourceIsDirectory {
                path: src.to_path_buf(),
            });
        }
        let resolved = absolutize(&inject_path(target, variables));
        let injector = Arc::clone(&self.injector);
        self.stage_blob(&resolved, opts, |blob| {
            if injector.should_inject(src, &resolved, variables)? {
                injector.inject(src, blob, variables)?;
            } else {
                fs::copy(src, blob).map_err(|e| io_err(src, e))?;
            }
            Ok(())
        })?;
        Ok(resolved)
    }

    /// Allocate a blob, fill it with `produce`, then record the entry. A
    /// superseded blob is deleted; a half-written new one never outlives a
    /// failure.
    fn stage_blob<F>(&mut self, target: &Path, opts: WriteOptions, produce: F) -> Result<(), StagingError>
    where
        F: FnOnce(&Path) -> Result<(), StagingError>,
    {
        let target = stageable(target)?;
        if let Some(parent) = target.parent() {
            self.ensure_directory(parent)?;
        }
        let blob = self.new_blob_path()?;

        if let Err(e) = produce(&blob) {
            remove_quietly(&blob);
            return Err(e);
        }

        let entry = StagingEntry::file(&target, &blob, opts.if_file_exists, opts.approve);
        let previous = match self.index()?.upsert(&entry) {
            Ok(previous) => previous,
            Err(e) => {
                remove_quietly(&blob);
                return Err(e);
            }
        };
        if let Some(old_blob) = previous.and_then(|p| p.blob_path) {
            if old_blob != blob {
                remove_quietly(&old_blob);
            }
        }
        tracing::debug!(
            path = %target.display(),
            blob = %blob.display(),
            approved = opts.approve,
            "staged file"
        );
        Ok(())
    }

    fn new_blob_path(&mut self) -> Result<PathBuf, StagingError> {
        // Ensures the root exists and the area is live.
        self.index()?;
        loop {
            let candidate = self
                .root
                .join(format!("{}.{BLOB_SUFFIX}", Uuid::new_v4().simple()));
            if !candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Commit / rollback
    // -----------------------------------------------------------------------

    /// Apply every directory and approved file to the target tree, then
    /// dispose the area.
    pub fn commit(&mut self) -> Result<CommitSummary, StagingError> {
        let mut summary = CommitSummary::default();

        let dirs = self.entries(EntryFilter::kind(EntryKind::Directory))?;
        for entry in dirs {
            let entry = entry?;
            fs::create_dir_all(&entry.target_path).map_err(|e| io_err(&entry.target_path, e))?;
            summary.directories += 1;
        }

        let files = self.entries(EntryFilter::kind(EntryKind::File))?;
        for entry in files {
            let entry = entry?;
            if !entry.approved {
                summary.unapproved += 1;
                continue;
            }
            let Some(blob) = entry.blob_path else {
                continue;
            };
            fs::copy(&blob, &entry.target_path).map_err(|e| io_err(&entry.target_path, e))?;
            fs::remove_file(&blob).map_err(|e| io_err(&blob, e))?;
            summary.files += 1;
        }

        self.dispose()?;
        tracing::info!(
            directories = summary.directories,
            files = summary.files,
            unapproved = summary.unapproved,
            "committed staging area"
        );
        Ok(summary)
    }

    /// Discard everything staged without touching the target tree.
    pub fn rollback(&mut self) -> Result<(), StagingError> {
        if self.disposed {
            return Err(StagingError::Disposed);
        }
        self.dispose()?;
        tracing::info!(root = %self.root.display(), "rolled back staging area");
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), StagingError> {
        self.disposed = true;
        if let Some(index) = self.index.take() {
            index.destroy()?;
        }
        sweep_blobs(&self.root)
    }
}

/// Delete every `*.blob` directly under `root`, indexed or not.
pub fn sweep_blobs(root: &Path) -> Result<(), StagingError> {
    if !root.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == BLOB_SUFFIX) {
            fs::remove_file(path).map_err(|e| io_err(path, e))?;
        }
    }
    Ok(())
}

/// Absolute form of `target`, rejected up front when it cannot be indexed.
fn stageable(target: &Path) -> Result<PathBuf, StagingError> {
    let target = absolutize(target);
    if target.to_str().is_none() {
        return Err(StagingError::NonUtf8Path { path: target });
    }
    Ok(target)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove blob");
        }
    }
}
