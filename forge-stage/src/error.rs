//! Error types for forge-stage.

use std::path::PathBuf;

use thiserror::Error;

use forge_core::PromptError;
use forge_renderer::RenderError;

/// All errors that can arise from staging, conflict resolution and commit.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The temp area was already committed or rolled back.
    #[error("staging area is disposed")]
    Disposed,

    /// A staged file hit an existing target under the `throw` policy.
    #[error("the file '{path}' already exists")]
    Conflict { path: PathBuf },

    /// The conflict prompt produced an answer with no known meaning.
    #[error("conflict resolution not implemented for '{path}' (answer: {answer})")]
    ResolutionNotImplemented { path: PathBuf, answer: String },

    /// A file operation was given a directory as its source.
    #[error("source is a directory: {path}")]
    SourceIsDirectory { path: PathBuf },

    /// A directory operation was given a file as its source.
    #[error("source must be a directory: {path}")]
    SourceIsFile { path: PathBuf },

    /// Staged paths are stored as text; this one is not valid UTF-8.
    #[error("cannot stage '{}': path is not valid UTF-8", path.display())]
    NonUtf8Path { path: PathBuf },

    /// Staging index storage failure.
    #[error("staging index error: {0}")]
    Index(#[from] sled::Error),

    /// Staging record (de)serialization failure.
    #[error("staging record codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Invalid glob pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Directory walk failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Rendering a templated file failed.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The prompt collaborator failed.
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`StagingError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StagingError {
    StagingError::Io {
        path: path.into(),
        source,
    }
}
