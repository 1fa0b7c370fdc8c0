//! Run-scoped directories and path helpers.
//!
//! Every path handed to the staging layer goes through [`ForgePaths`], so the
//! index only ever sees absolute, lexically normalised paths.

use std::path::{Component, Path, PathBuf};

use crate::value::Variables;

/// Base directories of one forge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgePaths {
    root: PathBuf,
    source: PathBuf,
    target: PathBuf,
    temp: PathBuf,
}

impl ForgePaths {
    /// `root` holds the generator, `source` its templates, `target` the
    /// project being generated into, `temp` the run's staging root.
    pub fn new(
        root: impl AsRef<Path>,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        temp: impl AsRef<Path>,
    ) -> Self {
        Self {
            root: absolutize(root.as_ref()),
            source: absolutize(source.as_ref()),
            target: absolutize(target.as_ref()),
            temp: absolutize(temp.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp(&self) -> &Path {
        &self.temp
    }

    /// Redirect the target directory (project config discovered higher up).
    pub fn set_target_dir(&mut self, dir: impl AsRef<Path>) {
        self.target = absolutize(dir.as_ref());
    }

    pub fn root_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        resolve_under(&self.root, rel.as_ref())
    }

    pub fn source_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        resolve_under(&self.source, rel.as_ref())
    }

    pub fn target_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        resolve_under(&self.target, rel.as_ref())
    }

    pub fn temp_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        resolve_under(&self.temp, rel.as_ref())
    }
}

fn resolve_under(base: &Path, rel: &Path) -> PathBuf {
    if rel.is_absolute() {
        normalize(rel)
    } else {
        normalize(&base.join(rel))
    }
}

/// Make `path` absolute against the current directory, then normalise it.
pub fn absolutize(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize(&abs)
}

/// Lexically fold `.` and `..` components. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Replace `${name}` placeholders with variable values.
///
/// Unknown names and unterminated placeholders are left as written. Paths
/// that are not valid UTF-8 are returned unchanged.
pub fn inject_path(path: &Path, variables: &Variables) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = &after[..end];
        match variables.get(name) {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    PathBuf::from(out)
}
