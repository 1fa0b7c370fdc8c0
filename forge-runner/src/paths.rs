use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const FORGE_DIR: &str = "forge";
pub const EXECUTIONS_DIR: &str = "executions";

/// `<system temp>/forge/executions`
pub fn executions_root() -> PathBuf {
    executions_root_in(&std::env::temp_dir())
}

pub fn executions_root_in(temp: &Path) -> PathBuf {
    temp.join(FORGE_DIR).join(EXECUTIONS_DIR)
}

/// Fresh, unused temp root for one run.
pub fn new_execution_dir() -> PathBuf {
    executions_root().join(Uuid::new_v4().to_string())
}
