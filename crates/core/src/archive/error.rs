//! Error types for archive extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop an extraction run. A single broken archive is not one
/// of them; it is recorded in the report instead.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archives directory not found: {path}")]
    ArchivesDirMissing { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction task failed: {0}")]
    Join(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
