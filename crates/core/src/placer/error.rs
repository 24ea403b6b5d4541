use std::path::PathBuf;
use thiserror::Error;

/// Stage of a transfer that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// Renaming the source straight onto the destination.
    Rename,
    /// Writing the `.partial` copy.
    Copy,
    /// Renaming the finished `.partial` copy into place.
    Publish,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Rename => "rename",
            Self::Copy => "copy",
            Self::Publish => "publish",
        })
    }
}

#[derive(Debug, Error)]
pub enum PlacerError {
    #[error("artifact vanished before commit: {path}")]
    SourceMissing { path: PathBuf },

    /// The final store already holds a file under this name.
    #[error("refusing to overwrite committed file: {path}")]
    AlreadyCommitted { path: PathBuf },

    #[error("cannot create store directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} failed moving {from} to {to}")]
    Transfer {
        stage: TransferStage,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The copy landed but the holding copy could not be removed.
    #[error("committed, but holding copy {path} was not removed")]
    SourceNotRemoved {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlacerError {
    pub(crate) fn transfer(
        stage: TransferStage,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Transfer {
            stage,
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Whether the source vanished before it could be placed.
    pub fn is_source_missing(&self) -> bool {
        matches!(self, Self::SourceMissing { .. })
    }
}
