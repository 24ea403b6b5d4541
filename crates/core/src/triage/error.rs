//! Error types for the triage module.

use std::path::PathBuf;
use thiserror::Error;

use crate::fetcher::FetchError;
use crate::placer::PlacerError;
use crate::registry::RegistryError;

/// Errors raised while triaging an artifact.
#[derive(Debug, Error)]
pub enum TriageError {
    /// The artifact vanished before it could be inspected or moved.
    #[error("Artifact disappeared: {path}")]
    SourceMissing { path: PathBuf },

    /// Filesystem failure in the holding directory.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Leftover files could not be cleared from the holding directory.
    #[error("Failed to clear holding directory: {0}")]
    Cleanup(#[source] FetchError),

    /// Committing to the final store failed.
    #[error(transparent)]
    Placement(#[from] PlacerError),

    /// Annotating the registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TriageError {
    /// Whether only this attempt failed, so the URL may be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SourceMissing { .. } => true,
            Self::Placement(e) => e.is_source_missing(),
            _ => false,
        }
    }

    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceMissing { path }
        } else {
            Self::Io { path, source }
        }
    }
}
