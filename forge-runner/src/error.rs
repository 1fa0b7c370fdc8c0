use std::path::PathBuf;

use thiserror::Error;

use forge_core::{ConfigError, PromptError, Stage};
use forge_stage::StagingError;

/// Error surface for the pipeline driver and its listeners.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("option '{name}' is invalid. {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("another run holds the lock at {path}")]
    Locked { path: PathBuf },

    /// Staging was requested before `init` created it.
    #[error("staging area is not available during '{0}'")]
    NotReady(Stage),

    /// A listener failed with a free-form message.
    #[error("listener failed during '{stage}': {message}")]
    Listener { stage: Stage, message: String },

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunError {
    RunError::Io {
        path: path.into(),
        source,
    }
}
