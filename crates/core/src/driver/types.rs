//! Batch run report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::batch::AdvanceOutcome;
use crate::retry::{Resolution, UrlResolution};

/// Where a batch run ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverPhase {
    Init,
    BatchPrepared,
    Processing,
    BatchDone,
    Advanced,
    Exhausted,
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::BatchPrepared => "batch_prepared",
            Self::Processing => "processing",
            Self::BatchDone => "batch_done",
            Self::Advanced => "advanced",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub batch: u64,
    pub phase: DriverPhase,
    /// Entries handed to the retry orchestrator.
    pub processed: usize,
    pub kept: usize,
    pub oversized: usize,
    pub failed: usize,
    /// Entries skipped because they were already annotated.
    pub skipped: usize,
    pub bytes_committed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance: Option<AdvanceOutcome>,
    pub resolutions: Vec<UrlResolution>,
}

impl BatchReport {
    pub(crate) fn new(run_id: Uuid, batch: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            batch,
            phase: DriverPhase::Init,
            processed: 0,
            kept: 0,
            oversized: 0,
            failed: 0,
            skipped: 0,
            bytes_committed: 0,
            started_at,
            finished_at: started_at,
            advance: None,
            resolutions: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, resolution: UrlResolution) {
        self.processed += 1;
        match &resolution.resolution {
            Resolution::Kept { artifact } => {
                self.kept += 1;
                self.bytes_committed += artifact.size_bytes;
            }
            Resolution::Oversized { .. } => self.oversized += 1,
            Resolution::Failed => self.failed += 1,
        }
        self.resolutions.push(resolution);
    }

    /// URLs that exhausted their retries.
    pub fn failed_urls(&self) -> impl Iterator<Item = &str> {
        self.resolutions
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| r.url.as_str())
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch {} ({})", self.batch, self.phase)?;
        writeln!(f, "  Processed:  {}", self.processed)?;
        writeln!(f, "  Kept:       {}", self.kept)?;
        writeln!(f, "  Oversized:  {}", self.oversized)?;
        writeln!(f, "  Failed:     {}", self.failed)?;
        writeln!(f, "  Skipped:    {}", self.skipped)?;
        writeln!(f, "  Committed:  {} bytes", self.bytes_committed)?;
        write!(f, "  Duration:   {}s", self.duration().num_seconds())?;
        for url in self.failed_urls() {
            write!(f, "\n  FAILED {url}")?;
        }
        Ok(())
    }
}
