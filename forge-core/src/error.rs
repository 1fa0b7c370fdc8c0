//! Error types for forge-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from project configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by a [`Prompter`](crate::prompt::Prompter).
#[derive(Debug, Error)]
pub enum PromptError {
    /// The terminal interaction itself failed (closed stdin, not a tty, ...).
    #[error("failed to get user input: {0}")]
    Interaction(String),

    /// A scripted prompter ran out of prepared answers.
    #[error("no answer available for question '{name}'")]
    Exhausted { name: String },

    /// A select question received an answer that is not one of its choices.
    #[error("answer '{answer}' is not a valid choice for '{name}'")]
    InvalidChoice { name: String, answer: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
