//! Triage result types.

use std::path::PathBuf;

use serde::Serialize;

/// A fetched media file and its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Terminal disposition of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum TriageOutcome {
    /// Committed; `artifact.path` is inside the final store.
    Kept { artifact: VideoArtifact },
    /// Over the threshold; the file is gone and the registry annotated.
    Discarded {
        artifact: VideoArtifact,
        /// Registry lines annotated across master registry and working set.
        annotated_lines: usize,
    },
}

impl TriageOutcome {
    pub fn artifact(&self) -> &VideoArtifact {
        match self {
            Self::Kept { artifact } | Self::Discarded { artifact, .. } => artifact,
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self, Self::Kept { .. })
    }
}
