//! Staging façade used by pipeline listeners.
//!
//! [`StagingArea`] resolves source paths against the template directory and
//! target paths against the project directory before handing them to the
//! [`TempArea`]. Glob selection (`copy`, `inject`) walks the source directory
//! and matches run-relative paths; `*` does not cross `/`, `**` does.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use forge_core::{inject_path, EntryKind, ForgePaths, Variables, WriteOptions};
use forge_renderer::Injector;

use crate::error::{io_err, StagingError};
use crate::index::{Entries, EntryFilter};
use crate::temp_area::{CommitSummary, TempArea};

pub struct StagingArea {
    paths: ForgePaths,
    area: TempArea,
}

impl StagingArea {
    /// Stage into `paths.temp()`.
    pub fn new(paths: ForgePaths, injector: Arc<dyn Injector>) -> Self {
        let area = TempArea::new(paths.temp(), injector);
        Self { paths, area }
    }

    pub fn paths(&self) -> &ForgePaths {
        &self.paths
    }

    pub fn temp_area(&mut self) -> &mut TempArea {
        &mut self.area
    }

    pub fn is_disposed(&self) -> bool {
        self.area.is_disposed()
    }

    fn live(&self) -> Result<(), StagingError> {
        if self.area.is_disposed() {
            return Err(StagingError::Disposed);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Single entries
    // -----------------------------------------------------------------------

    pub fn ensure_directory(&mut self, path: impl AsRef<Path>) -> Result<(), StagingError> {
        let target = self.paths.target_path(path);
        self.area.ensure_directory(&target)
    }

    pub fn write_file(
        &mut self,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        opts: WriteOptions,
    ) -> Result<(), StagingError> {
        let target = self.paths.target_path(path);
        self.area.write_file(&target, content.as_ref(), opts)
    }

    pub fn copy_file(
        &mut self,
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        opts: WriteOptions,
    ) -> Result<(), StagingError> {
        let source = self.paths.source_path(src);
        let target = self.paths.target_path(dest);
        self.area.copy_file(&source, &target, opts)
    }

    /// Render `src` into `dest`; `${name}` placeholders in `dest` are
    /// expanded. Returns the resolved target path.
    pub fn inject_file(
        &mut self,
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        variables: &Variables,
        opts: WriteOptions,
    ) -> Result<PathBuf, StagingError> {
        let source = self.paths.source_path(src);
        let target = self.paths.target_path(dest);
        self.area.inject_file(&source, &target, variables, opts)
    }

    /// Stage a directory under its placeholder-expanded path.
    pub fn inject_directory(&mut self, path: impl AsRef<Path>, variables: &Variables) -> Result<(), StagingError> {
        let expanded = inject_path(path.as_ref(), variables);
        self.ensure_directory(expanded)
    }

    // -----------------------------------------------------------------------
    // Whole trees
    // -----------------------------------------------------------------------

    /// Stage every sub-directory, then every file, of `src` under `dest`.
    pub fn copy_directory(
        &mut self,
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        opts: WriteOptions,
    ) -> Result<(), StagingError> {
        self.live()?;
        let source = self.paths.source_path(src);
        let target = self.paths.target_path(dest);
        let (dirs, files) = split_tree(&source)?;

        self.area.ensure_directory(&target)?;
        for rel in dirs {
            self.area.ensure_directory(&target.join(rel))?;
        }
        for rel in files {
            self.area.copy_file(&source.join(&rel), &target.join(&rel), opts)?;
        }
        Ok(())
    }

    /// Copy every source entry matching `patterns` to the same relative
    /// location in the target. Matched directories are copied whole.
    pub fn copy<S: AsRef<str>>(&mut self, patterns: &[S], opts: WriteOptions) -> Result<usize, StagingError> {
        self.live()?;
        let mut staged = 0;
        for (rel, is_dir) in self.select(patterns)? {
            if is_dir {
                self.copy_directory(&rel, &rel, opts)?;
            } else {
                self.copy_file(&rel, &rel, opts)?;
            }
            staged += 1;
        }
        tracing::debug!(staged, "copied matching source entries");
        Ok(staged)
    }

    /// Render every source entry matching `patterns` into the target.
    /// Matched directories are injected whole, each path placeholder-expanded.
    pub fn inject<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        variables: &Variables,
        opts: WriteOptions,
    ) -> Result<usize, StagingError> {
        self.live()?;
        let mut staged = 0;
        for (rel, is_dir) in self.select(patterns)? {
            if is_dir {
                self.inject_directory(&rel, variables)?;
                let (dirs, files) = split_tree(&self.paths.source_path(&rel))?;
                for sub in dirs {
                    self.inject_directory(rel.join(sub), variables)?;
                }
                for sub in files {
                    let path = rel.join(sub);
                    self.inject_file(&path, &path, variables, opts)?;
                }
            } else {
                self.inject_file(&rel, &rel, variables, opts)?;
            }
            staged += 1;
        }
        tracing::debug!(staged, "injected matching source entries");
        Ok(staged)
    }

    /// Source-relative paths matching `patterns`, outermost match only: once
    /// a directory matches, its contents are not listed separately.
    fn select<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<(PathBuf, bool)>, StagingError> {
        let set = build_globset(patterns)?;
        let source = self.paths.source();
        let mut selected = Vec::new();

        let mut walker = WalkDir::new(source).min_depth(1).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry?;
            let Ok(rel) = entry.path().strip_prefix(source) else {
                continue;
            };
            if !set.is_match(rel) {
                continue;
            }
            let is_dir = entry.file_type().is_dir();
            selected.push((rel.to_path_buf(), is_dir));
            if is_dir {
                walker.skip_current_dir();
            }
        }
        Ok(selected)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Read a file from the template directory.
    pub fn read_file_source(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StagingError> {
        self.live()?;
        let source = self.paths.source_path(path);
        fs::read(&source).map_err(|e| io_err(&source, e))
    }

    /// Staged content for a target path.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>, StagingError> {
        let target = self.paths.target_path(path);
        self.area.read_file(&target)
    }

    /// Whether anything is staged at a target path.
    pub fn exists(&mut self, path: impl AsRef<Path>) -> Result<bool, StagingError> {
        let target = self.paths.target_path(path);
        self.area.exists(&target)
    }

    pub fn exists_source(&self, path: impl AsRef<Path>) -> Result<bool, StagingError> {
        self.live()?;
        Ok(self.paths.source_path(path).exists())
    }

    /// Blob currently holding the staged content of a target file.
    pub fn blob_path(&mut self, path: impl AsRef<Path>) -> Result<Option<PathBuf>, StagingError> {
        let target = self.paths.target_path(path);
        Ok(self
            .area
            .get(&target, EntryKind::File)?
            .and_then(|entry| entry.blob_path))
    }

    pub fn approve_file(&mut self, path: impl AsRef<Path>) -> Result<bool, StagingError> {
        let target = self.paths.target_path(path);
        self.area.approve(&target)
    }

    /// Staged directories, parents first.
    pub fn directories(&mut self) -> Result<Vec<PathBuf>, StagingError> {
        self.entries(EntryKind::Directory)?
            .map(|entry| entry.map(|e| e.target_path))
            .collect()
    }

    pub fn entries(&mut self, kind: EntryKind) -> Result<Entries, StagingError> {
        self.area.entries(EntryFilter::kind(kind))
    }

    // -----------------------------------------------------------------------
    // Transaction
    // -----------------------------------------------------------------------

    pub fn commit(&mut self) -> Result<CommitSummary, StagingError> {
        self.area.commit()
    }

    pub fn rollback(&mut self) -> Result<(), StagingError> {
        self.area.rollback()
    }
}

fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, StagingError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.as_ref())
            .literal_separator(true)
            .build()?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Relative sub-directories and files of `dir`, each list in walk order.
fn split_tree(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), StagingError> {
    if !dir.is_dir() {
        return Err(StagingError::SourceIsFile {
            path: dir.to_path_buf(),
        });
    }
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if entry.file_type().is_dir() {
            dirs.push(rel.to_path_buf());
        } else {
            files.push(rel.to_path_buf());
        }
    }
    Ok((dirs, files))
}
