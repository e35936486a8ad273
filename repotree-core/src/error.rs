//! Error types for repotree-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading manifests and definitions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (manifest init path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No manifest in `start` or any of its ancestors.
    #[error("no {} found in {start} or any parent directory", crate::paths::MANIFEST_FILE)]
    ManifestNotFound { start: PathBuf },

    /// The manifest was written for a different schema version.
    #[error("manifest {path} has version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// `init` refuses to replace an existing manifest.
    #[error("manifest already exists at {path}")]
    ManifestExists { path: PathBuf },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
