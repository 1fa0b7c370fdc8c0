//! Pipeline driver.
//!
//! # Stage sequence
//!
//! ```text
//! init -> prompt -> write -> conflicts -> commit -> end
//!                     \          \          \
//!                      +----------+----------+--> rollback -> end
//! ```
//!
//! `write`, `conflicts` and `commit` share one failure boundary: any error
//! there is reported and turns into a rollback. `end` always runs once the
//! lock is held. A Stop choice during `conflicts` skips the `rollback` and
//! `end` events but still discards staging, releases the lock and removes
//! the temp root.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use walkdir::WalkDir;

use forge_core::{ConfigOptions, Stage, Value};
use forge_renderer::{Injector, TeraInjector};
use forge_stage::{resolve_conflicts, CommitSummary, Resolution, StagingArea};

use crate::error::{io_err, RunError};
use crate::events::EventBus;
use crate::forge::{Forge, VariablesOptions};
use crate::lock::{RunLock, LOCK_FILE_NAME};

type OptionValidator = Box<dyn Fn(&str, &Value) -> Result<(), String>>;
type CommandValidator = Box<dyn Fn(&Forge) -> Result<(), String>>;

/// How a run finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Committed(CommitSummary),
    /// Staging was discarded; `stage` is where the run left the happy path.
    RolledBack { stage: Stage, reason: String },
    /// The operator chose Stop Execution.
    Stopped,
}

enum Flow {
    Committed(CommitSummary),
    RollbackRequested,
    Stop,
}

pub struct Runner {
    forge: Forge,
    events: EventBus,
    lock: Option<RunLock>,
    injector: Arc<dyn Injector>,
    option_validators: Vec<OptionValidator>,
    command_validators: Vec<CommandValidator>,
    load_config: bool,
}

impl Runner {
    pub fn new(forge: Forge) -> Self {
        Self {
            forge,
            events: EventBus::new(),
            lock: None,
            injector: Arc::new(TeraInjector::new()),
            option_validators: Vec::new(),
            command_validators: Vec::new(),
            load_config: true,
        }
    }

    pub fn forge(&self) -> &Forge {
        &self.forge
    }

    pub fn forge_mut(&mut self) -> &mut Forge {
        &mut self.forge
    }

    /// Register a listener for `stage`.
    pub fn on<F>(&mut self, stage: Stage, listener: F) -> &mut Self
    where
        F: FnMut(&mut Forge) -> Result<(), RunError> + 'static,
    {
        self.events.on(stage, listener);
        self
    }

    /// Check every program option during `init`, before staging exists.
    pub fn validate_options<F>(&mut self, validator: F) -> &mut Self
    where
        F: Fn(&str, &Value) -> Result<(), String> + 'static,
    {
        self.option_validators.push(Box::new(validator));
        self
    }

    /// Check the run as a whole during `init`, before staging exists.
    pub fn validate_command<F>(&mut self, validator: F) -> &mut Self
    where
        F: Fn(&Forge) -> Result<(), String> + 'static,
    {
        self.command_validators.push(Box::new(validator));
        self
    }

    /// Replace the content injector used by staging.
    pub fn file_injector(&mut self, injector: Arc<dyn Injector>) -> &mut Self {
        self.injector = injector;
        self
    }

    pub fn config_options(&mut self, options: ConfigOptions) -> &mut Self {
        self.forge.config.options = options;
        self
    }

    pub fn variables_options(&mut self, options: VariablesOptions) -> &mut Self {
        self.forge.variables_options = options;
        self
    }

    /// Look for a project config above the target during `init`. On by
    /// default.
    pub fn load_config(&mut self, enabled: bool) -> &mut Self {
        self.load_config = enabled;
        self
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    /// Drive the whole stage sequence.
    ///
    /// Errors are returned only for failures outside the write / conflicts /
    /// commit boundary: validation, locking, and `init` / `prompt`
    /// listeners. Cleanup has already run when they are returned.
    pub fn run(&mut self) -> Result<RunOutcome, RunError> {
        if let Err(e) = self.init() {
            if self.lock.is_some() {
                self.end();
            }
            return Err(e);
        }
        if let Err(e) = self.prompt() {
            self.end();
            return Err(e);
        }

        let outcome = match self.transaction() {
            Ok(Flow::Committed(summary)) => RunOutcome::Committed(summary),
            Ok(Flow::RollbackRequested) => {
                self.rollback();
                RunOutcome::RolledBack {
                    stage: Stage::Conflicts,
                    reason: "rollback requested".to_string(),
                }
            }
            Ok(Flow::Stop) => {
                println!("{}", "Execution stopped".yellow().bold());
                self.teardown();
                return Ok(RunOutcome::Stopped);
            }
            Err(e) => {
                let stage = self.forge.stage;
                println!(
                    "{}",
                    format!("An error occurred during '{stage}' stage:\n{e}\n\nRolling back...").red()
                );
                tracing::warn!(stage = %stage, error = %e, "stage failed");
                self.rollback();
                RunOutcome::RolledBack {
                    stage,
                    reason: e.to_string(),
                }
            }
        };

        self.end();
        Ok(outcome)
    }

    fn enter(&mut self, stage: Stage) {
        self.forge.stage = stage;
        tracing::info!(stage = %stage, task = %self.forge.task(), "entering stage");
    }

    fn init(&mut self) -> Result<(), RunError> {
        self.enter(Stage::Init);
        self.validate()?;

        if self.load_config {
            let target = self.forge.paths.target().to_path_buf();
            if self.forge.config.load(&target)? {
                let dir = self
                    .forge
                    .config
                    .config_path()
                    .and_then(|p| p.parent())
                    .map(|p| p.to_path_buf());
                if let Some(dir) = dir {
                    tracing::info!(target = %dir.display(), "project config redirects target");
                    self.forge.paths.set_target_dir(dir);
                }
            }
        }

        let temp = self.forge.paths.temp().to_path_buf();
        fs::create_dir_all(&temp).map_err(|e| io_err(&temp, e))?;
        self.lock = Some(RunLock::acquire(temp.join(LOCK_FILE_NAME))?);
        self.forge.staging = Some(StagingArea::new(
            self.forge.paths.clone(),
            Arc::clone(&self.injector),
        ));

        self.events.emit(Stage::Init, &mut self.forge)
    }

    fn validate(&self) -> Result<(), RunError> {
        for validator in &self.command_validators {
            validator(&self.forge).map_err(RunError::InvalidCommand)?;
        }
        for (name, value) in self.forge.options() {
            for validator in &self.option_validators {
                validator(name, value).map_err(|reason| RunError::InvalidOption {
                    name: name.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }

    fn prompt(&mut self) -> Result<(), RunError> {
        self.enter(Stage::Prompt);
        self.events.emit(Stage::Prompt, &mut self.forge)
    }

    /// write, conflicts and commit: the failure boundary.
    fn transaction(&mut self) -> Result<Flow, RunError> {
        self.enter(Stage::Write);
        self.events.emit(Stage::Write, &mut self.forge)?;

        self.enter(Stage::Conflicts);
        let resolution = {
            let Forge {
                staging,
                prompter,
                stage,
                ..
            } = &mut self.forge;
            let staging = staging.as_mut().ok_or(RunError::NotReady(*stage))?;
            resolve_conflicts(staging.temp_area(), prompter.as_mut())?
        };
        match resolution {
            Resolution::Completed(_) => {}
            Resolution::RollbackRequested => return Ok(Flow::RollbackRequested),
            Resolution::StopRequested => return Ok(Flow::Stop),
        }
        self.events.emit(Stage::Conflicts, &mut self.forge)?;

        self.enter(Stage::Commit);
        if self.forge.config.options.auto_save && self.forge.config.has_pending_changes() {
            let target = self.forge.paths.target().to_path_buf();
            self.forge.config.save(&target)?;
        }
        let summary = self.forge.staging()?.commit()?;
        self.events.emit(Stage::Commit, &mut self.forge)?;
        Ok(Flow::Committed(summary))
    }

    fn rollback(&mut self) {
        self.enter(Stage::Rollback);
        match self.forge.staging.as_mut() {
            Some(staging) if staging.is_disposed() => {
                println!(
                    "{}",
                    "Changes were already committed, could not rollback. Please do it manually or configure it on rollback stage."
                        .yellow()
                        .bold()
                );
                tracing::warn!("rollback requested after commit");
            }
            Some(staging) => {
                if let Err(e) = staging.rollback() {
                    tracing::warn!(error = %e, "rollback failed");
                }
            }
            None => {}
        }
        self.emit_reported(Stage::Rollback);
    }

    fn end(&mut self) {
        self.enter(Stage::End);
        self.emit_reported(Stage::End);
        self.teardown();
    }

    /// Emit where listener failures must not stop cleanup.
    fn emit_reported(&mut self, stage: Stage) {
        if let Err(e) = self.events.emit(stage, &mut self.forge) {
            println!("{}", format!("'{stage}' listener failed: {e}").yellow());
            tracing::warn!(stage = %stage, error = %e, "listener failed");
        }
    }

    /// Discard live staging, sweep and remove the temp root, release the lock.
    fn teardown(&mut self) {
        if let Some(staging) = self.forge.staging.as_mut() {
            if !staging.is_disposed() {
                if let Err(e) = staging.rollback() {
                    tracing::warn!(error = %e, "failed to discard staging area");
                }
            }
        }

        let temp = self.forge.paths.temp().to_path_buf();
        for path in leftover_files(&temp) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove leftover file");
            }
        }
        if let Some(lock) = self.lock.take() {
            if let Err(e) = lock.release() {
                tracing::warn!(error = %e, "failed to release run lock");
            }
        }
        if temp.exists() {
            if let Err(e) = fs::remove_dir_all(&temp) {
                tracing::warn!(path = %temp.display(), error = %e, "failed to remove temp root");
            }
        }
        tracing::debug!(temp = %temp.display(), "temp root cleaned");
    }
}

/// Every file under `temp` except the lock marker.
fn leftover_files(temp: &std::path::Path) -> Vec<PathBuf> {
    WalkDir::new(temp)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() != LOCK_FILE_NAME)
        .map(|e| e.into_path())
        .collect()
}
