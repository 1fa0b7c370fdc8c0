//! Forge core library: domain types, variables, paths, project config and
//! the prompt collaborator interface.
//!
//! - [`types`]: stages, entry kinds, conflict policies and choices
//! - [`value`]: [`Value`] / [`Variables`] template data
//! - [`paths`]: [`ForgePaths`], lexical normalisation, `${var}` placeholders
//! - [`config`]: [`ProjectConfig`] load / save
//! - [`prompt`]: [`Prompter`] trait and question descriptors

pub mod config;
pub mod error;
pub mod paths;
pub mod prompt;
pub mod types;
pub mod value;

pub use config::{ConfigOptions, ProjectConfig, Scope, CONFIG_FILE_NAME, LEGACY_CONFIG_FILE_NAME};
pub use error::{ConfigError, PromptError};
pub use paths::{inject_path, normalize, ForgePaths};
pub use prompt::{Choice, Prompter, Question, ScriptedPrompter};
pub use types::{ConflictChoice, ConflictPolicy, EntryKind, Stage, TaskName, WriteOptions};
pub use value::{Value, Variables};
