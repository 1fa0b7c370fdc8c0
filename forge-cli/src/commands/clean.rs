//! `forge clean` — remove temp roots of runs that no longer hold their lock.

use std::fs;

use anyhow::{Context, Result};
use clap::Args;

use forge_runner::{executions_root, is_locked, LOCK_FILE_NAME};

/// Arguments for `forge clean`.
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// List what would be removed without removing it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanArgs {
    pub fn run(self) -> Result<()> {
        let root = executions_root();
        if !root.is_dir() {
            println!("✓ nothing to clean");
            return Ok(());
        }

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        let mut removed = 0;
        let mut active = 0;
        let entries = fs::read_dir(&root)
            .with_context(|| format!("could not read {}", root.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("could not read {}", root.display()))?
                .path();
            if !path.is_dir() {
                continue;
            }
            if is_locked(&path.join(LOCK_FILE_NAME)) {
                active += 1;
                continue;
            }
            if !self.dry_run {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("could not remove {}", path.display()))?;
            }
            println!("{prefix}removed {}", path.display());
            removed += 1;
        }

        println!("{prefix}✓ {removed} stale execution(s) removed, {active} still running");
        Ok(())
    }
}
