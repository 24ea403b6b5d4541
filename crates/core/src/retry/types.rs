//! Attempt and resolution records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::triage::{TriageOutcome, VideoArtifact};

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// An artifact was found and triage resolved it.
    Success { path: PathBuf },
    /// The fetcher failed or produced nothing recognisable.
    TransientFailure { reason: String },
    /// The fetcher's artifact could not be triaged (it vanished). Fatal for
    /// this attempt only.
    FatalFailure { reason: String },
}

/// One invocation of the content fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadAttempt {
    pub url: String,
    /// 1-based.
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

/// How a URL's retry cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Kept { artifact: VideoArtifact },
    Oversized {
        artifact: VideoArtifact,
        annotated_lines: usize,
    },
    /// Attempt budget exhausted. The URL stays unannotated.
    Failed,
}

impl From<TriageOutcome> for Resolution {
    fn from(outcome: TriageOutcome) -> Self {
        match outcome {
            TriageOutcome::Kept { artifact } => Self::Kept { artifact },
            TriageOutcome::Discarded {
                artifact,
                annotated_lines,
            } => Self::Oversized {
                artifact,
                annotated_lines,
            },
        }
    }
}

/// Full record of one URL's retry cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlResolution {
    pub url: String,
    pub id: u64,
    pub resolution: Resolution,
    pub attempts: Vec<DownloadAttempt>,
}

impl UrlResolution {
    /// Kept or oversized: the URL will not need fetching again.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.resolution, Resolution::Failed)
    }

    /// Label used for metrics and summaries.
    pub fn label(&self) -> &'static str {
        match self.resolution {
            Resolution::Kept { .. } => "kept",
            Resolution::Oversized { .. } => "oversized",
            Resolution::Failed => "failed",
        }
    }
}
