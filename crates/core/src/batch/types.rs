//! Types returned by the batch cursor.

use serde::Serialize;

use crate::registry::LinkRecord;

/// A batch materialised into the working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedBatch {
    /// 1-based batch number.
    pub batch: u64,
    /// 0-based registry index of the first record in `records`.
    pub start: usize,
    /// Records written to the working set, in registry order.
    pub records: Vec<LinkRecord>,
    /// Registry length at preparation time.
    pub total_links: usize,
}

impl PreparedBatch {
    /// Records that still need fetching.
    pub fn processable(&self) -> impl Iterator<Item = &LinkRecord> {
        self.records.iter().filter(|r| r.is_processable())
    }

    /// 1-based registry line range covered, inclusive.
    pub fn line_range(&self) -> (usize, usize) {
        (self.start + 1, self.start + self.records.len())
    }
}

/// Result of `BatchCursor::prepare_current_batch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Prepared(PreparedBatch),
    /// The current batch slice is empty or already drained.
    NoMoreWork { batch: u64 },
}

/// Result of `BatchCursor::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The cursor now names batch `to`.
    Advanced { to: u64 },
    /// No further nonempty batch exists; the cursor stays on `batch`.
    Exhausted { batch: u64, total_links: usize },
}

/// Progress summary of the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStatus {
    pub current_batch: u64,
    pub total_batches: u64,
    pub total_links: usize,
    pub links_processed: usize,
    pub links_remaining: usize,
    /// Lines carrying an annotation (excluded from processing).
    pub annotated_links: usize,
    pub batch_size: usize,
    pub percent_complete: f64,
}

impl BatchStatus {
    pub fn is_complete(&self) -> bool {
        self.links_remaining == 0
    }
}
