//! Error types for repotree-sync.

use std::path::PathBuf;

use thiserror::Error;

use repotree_core::CoreError;
use repotree_git::GitError;

/// All errors that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Manifest or definition document failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A git command that the run cannot continue without (clone, bootstrap).
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A confirmed move would overwrite an existing directory.
    #[error("cannot move {from} to {to}: destination already exists")]
    MoveDestinationExists { from: String, to: PathBuf },

    #[error("no answer within {secs}s")]
    PromptTimeout { secs: u64 },

    #[error("failed to read answer: {0}")]
    Prompt(String),

    /// The remote repository listing could not be fetched.
    #[error("remote listing failed: {0}")]
    Remote(String),

    #[error("background task failed: {0}")]
    Join(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
