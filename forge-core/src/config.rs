//! Project configuration persisted next to generated projects.
//!
//! # Storage layout
//!
//! ```text
//! <project>/
//!   config.forge.json    { "project": {..}, "tasks": { "<task>": {..} } }
//! ```
//!
//! [`ProjectConfig::load`] searches the start directory and then each
//! ancestor, so running a task from a sub-directory still finds the project
//! root. Each directory is checked for [`CONFIG_FILE_NAME`] first, then for
//! the older [`LEGACY_CONFIG_FILE_NAME`]; a legacy file is saved back in
//! place. Saves use the `.tmp` sibling + rename pattern.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::TaskName;
use crate::value::{Value, Variables};

/// File name searched for by [`ProjectConfig::load`].
pub const CONFIG_FILE_NAME: &str = "config.forge.json";

/// Name used by projects configured with earlier hyperforge releases.
pub const LEGACY_CONFIG_FILE_NAME: &str = "config.hf.json";

/// Which half of the document a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Values private to the current task.
    #[default]
    Task,
    /// Values shared by every task of the project.
    Project,
}

/// Config behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOptions {
    /// Save pending changes automatically during the commit stage.
    pub auto_save: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self { auto_save: true }
    }
}

/// On-disk document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub project: Variables,
    #[serde(default)]
    pub tasks: BTreeMap<String, Variables>,
}

/// Project / task configuration for one run.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    task: TaskName,
    values: ConfigDocument,
    pending_changes: bool,
    config_path: Option<PathBuf>,
    pub options: ConfigOptions,
}

impl ProjectConfig {
    pub fn new(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            values: ConfigDocument::default(),
            pending_changes: false,
            config_path: None,
            options: ConfigOptions::default(),
        }
    }

    pub fn task(&self) -> &TaskName {
        &self.task
    }

    pub fn get(&self, key: &str, scope: Scope) -> Option<&Value> {
        self.scope_values(scope).and_then(|vars| vars.get(key))
    }

    /// Snapshot of every value in `scope`; empty when nothing is set.
    pub fn values(&self, scope: Scope) -> Variables {
        self.scope_values(scope).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>, scope: Scope) {
        self.pending_changes = true;
        self.scope_values_mut(scope).insert(key.into(), value.into());
    }

    pub fn set_values(&mut self, values: Variables, scope: Scope) {
        for (key, value) in values {
            self.set(key, value, scope);
        }
    }

    /// Remove `key`; only a real removal counts as a pending change.
    pub fn delete(&mut self, key: &str, scope: Scope) {
        let removed = match scope {
            Scope::Project => self.values.project.remove(key),
            Scope::Task => self
                .values
                .tasks
                .get_mut(&self.task.0)
                .and_then(|vars| vars.remove(key)),
        };
        if removed.is_some() {
            self.pending_changes = true;
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_changes
    }

    /// Path of the loaded (or last saved) config file.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Search `start_dir` and its ancestors for [`CONFIG_FILE_NAME`] and load
    /// the first match. Returns `false` when the directory does not exist or
    /// no config file is found.
    pub fn load(&mut self, start_dir: &Path) -> Result<bool, ConfigError> {
        if !start_dir.exists() {
            return Ok(false);
        }
        let Some(path) = find_config_file(start_dir) else {
            return Ok(false);
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let values: ConfigDocument = serde_json::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), "loaded project config");
        self.values = values;
        self.config_path = Some(path);
        self.pending_changes = false;
        Ok(true)
    }

    /// Write the document atomically. When nothing was loaded yet the file
    /// is created in `default_dir`.
    pub fn save(&mut self, default_dir: &Path) -> Result<(), ConfigError> {
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(|| default_dir.join(CONFIG_FILE_NAME));
        let Some(dir) = path.parent() else {
            return Err(io_err(path, std::io::Error::other("invalid config path")));
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }

        tracing::debug!(path = %path.display(), "saved project config");
        self.config_path = Some(path);
        self.pending_changes = false;
        Ok(())
    }

    fn scope_values(&self, scope: Scope) -> Option<&Variables> {
        match scope {
            Scope::Project => Some(&self.values.project),
            Scope::Task => self.values.tasks.get(&self.task.0),
        }
    }

    fn scope_values_mut(&mut self, scope: Scope) -> &mut Variables {
        match scope {
            Scope::Project => &mut self.values.project,
            Scope::Task => self.values.tasks.entry(self.task.0.clone()).or_default(),
        }
    }
}

fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .flat_map(|dir| [dir.join(CONFIG_FILE_NAME), dir.join(LEGACY_CONFIG_FILE_NAME)])
        .find(|candidate| candidate.is_file())
}
