//! Batch cursor over the link registry.
//!
//! The registry is partitioned into fixed-size contiguous slices. A persisted
//! cursor names the batch the next run works on; preparing a batch copies its
//! slice into the working set, and advancing moves the cursor one batch
//! forward once the operator (or the driver, with auto-advance) decides the
//! current batch is done.
//!
//! When the last batch has been advanced past, the cursor stays on it and a
//! separate drain marker records how many registry lines have been handed
//! out. Lines appended to the registry afterwards are picked up by the next
//! prepare without re-issuing the drained ones.

mod cursor;
mod types;

pub use cursor::BatchCursor;
pub use types::{AdvanceOutcome, BatchStatus, PrepareOutcome, PreparedBatch};
