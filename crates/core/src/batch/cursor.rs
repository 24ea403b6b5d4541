//! Persistent batch cursor.

use std::sync::Arc;

use tracing::{debug, info};

use crate::registry::{LinkRecord, LinkRegistry, RegistryError};
use crate::store::{PersistedInteger, StoreError, TextStore};

use super::types::{AdvanceOutcome, BatchStatus, PrepareOutcome, PreparedBatch};

/// Cursor naming the current batch, plus the drain marker.
#[derive(Clone)]
pub struct BatchCursor {
    cursor: PersistedInteger,
    drain: PersistedInteger,
    batch_size: usize,
}

impl BatchCursor {
    pub fn new(
        cursor_store: Arc<dyn TextStore>,
        drain_store: Arc<dyn TextStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            cursor: PersistedInteger::new(cursor_store),
            drain: PersistedInteger::new(drain_store),
            // A zero size would make every slice empty.
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Current batch number, persisting 1 if the cursor does not exist yet.
    pub fn current_batch(&self) -> Result<u64, StoreError> {
        let batch = self.cursor.get_or_init(1)?;
        self.check_batch(batch)
    }

    /// Current batch number without creating the cursor.
    pub fn peek_batch(&self) -> Result<u64, StoreError> {
        let batch = self.cursor.get()?.unwrap_or(1);
        self.check_batch(batch)
    }

    /// Number of leading registry lines already handed out when the registry
    /// was last reported exhausted.
    pub fn drained_through(&self) -> Result<usize, StoreError> {
        Ok(self.drain.get()?.unwrap_or(0) as usize)
    }

    /// Registry index range `[start, end)` of a batch, clamped to `len`.
    pub fn bounds(&self, batch: u64, len: usize) -> (usize, usize) {
        let start = (batch.saturating_sub(1) as usize).saturating_mul(self.batch_size);
        let start = start.min(len);
        let end = start.saturating_add(self.batch_size).min(len);
        (start, end)
    }

    /// The slice of `records` belonging to `batch`. Empty past the end.
    pub fn slice<'a>(&self, records: &'a [LinkRecord], batch: u64) -> &'a [LinkRecord] {
        let (start, end) = self.bounds(batch, records.len());
        &records[start..end]
    }

    /// Writes the current batch into the working set.
    ///
    /// Repeated calls without an `advance` in between produce the same
    /// working set. Lines covered by the drain marker are never handed out
    /// again.
    pub fn prepare_current_batch(
        &self,
        registry: &LinkRegistry,
        working_set: &LinkRegistry,
    ) -> Result<PrepareOutcome, RegistryError> {
        let mut batch = self.current_batch()?;
        let records = registry.load_required()?;
        let drained = self.drained_through()?;

        // Drained on a batch boundary: appended lines start the next batch.
        let (_, end) = self.bounds(batch, records.len());
        if drained >= end && drained < records.len() {
            let reopened = (drained / self.batch_size) as u64 + 1;
            if reopened > batch {
                self.cursor.set(reopened)?;
                info!(from = batch, to = reopened, "appended links open a new batch");
                batch = reopened;
            }
        }

        let (start, end) = self.bounds(batch, records.len());
        let from = start.max(drained);

        info!(
            batch,
            total_links = records.len(),
            first_line = start + 1,
            last_line = end,
            "computing batch slice"
        );

        if from >= end {
            info!(batch, "no more links to process");
            return Ok(PrepareOutcome::NoMoreWork { batch });
        }

        let slice = records[from..end].to_vec();
        working_set.write_records(&slice)?;

        info!(
            batch,
            links = slice.len(),
            working_set = %working_set.location(),
            "batch prepared"
        );

        Ok(PrepareOutcome::Prepared(PreparedBatch {
            batch,
            start: from,
            records: slice,
            total_links: records.len(),
        }))
    }

    /// Moves the cursor to the next batch if it has any lines.
    ///
    /// Otherwise the cursor is left alone and the drain marker is raised to
    /// the registry length.
    pub fn advance(&self, registry: &LinkRegistry) -> Result<AdvanceOutcome, RegistryError> {
        let batch = self.current_batch()?;
        let total_links = registry.load_required()?.len();
        let (next_start, _) = self.bounds(batch + 1, usize::MAX);

        if next_start >= total_links {
            let drained = self.drained_through()?;
            if total_links > drained {
                self.drain.set(total_links as u64)?;
            }
            info!(batch, total_links, "all batches completed");
            return Ok(AdvanceOutcome::Exhausted { batch, total_links });
        }

        self.cursor.set(batch + 1)?;
        info!(from = batch, to = batch + 1, "advanced to next batch");
        Ok(AdvanceOutcome::Advanced { to: batch + 1 })
    }

    /// Progress over the whole registry. Never creates any file.
    ///
    /// A missing registry reports zero links.
    pub fn status(&self, registry: &LinkRegistry) -> Result<BatchStatus, RegistryError> {
        let current_batch = self.peek_batch()?;
        let records = registry.load()?;
        let total_links = records.len();
        let size = self.batch_size;

        let by_cursor = self.bounds(current_batch, total_links).0;
        let by_marker = self.drained_through()?.min(total_links);
        let links_processed = by_cursor.max(by_marker);
        let links_remaining = total_links - links_processed;

        let percent_complete = if total_links == 0 {
            0.0
        } else {
            links_processed as f64 * 100.0 / total_links as f64
        };

        let status = BatchStatus {
            current_batch,
            total_batches: total_links.div_ceil(size) as u64,
            total_links,
            links_processed,
            links_remaining,
            annotated_links: records.iter().filter(|r| !r.is_processable()).count(),
            batch_size: size,
            percent_complete,
        };
        debug!(?status, "batch status computed");
        Ok(status)
    }

    fn check_batch(&self, batch: u64) -> Result<u64, StoreError> {
        if batch == 0 {
            return Err(StoreError::Corrupt {
                location: self.cursor.location(),
                reason: "batch numbers start at 1".to_string(),
            });
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Annotation;
    use crate::store::MemoryStore;

    struct Fixture {
        registry: LinkRegistry,
        working: LinkRegistry,
        working_mem: MemoryStore,
        cursor_mem: MemoryStore,
        drain_mem: MemoryStore,
        registry_mem: MemoryStore,
    }

    impl Fixture {
        fn new(links: usize) -> Self {
            let text: String = (1..=links)
                .map(|i| format!("https://example.com/reel/{i}\n"))
                .collect();
            let registry_mem = MemoryStore::with_contents("all_links", text);
            let working_mem = MemoryStore::new("links");
            Self {
                registry: LinkRegistry::new(Arc::new(registry_mem.clone())),
                working: LinkRegistry::new(Arc::new(working_mem.clone())),
                working_mem,
                cursor_mem: MemoryStore::new("cursor"),
                drain_mem: MemoryStore::new("drain"),
                registry_mem,
            }
        }

        fn cursor(&self, size: usize) -> BatchCursor {
            BatchCursor::new(
                Arc::new(self.cursor_mem.clone()),
                Arc::new(self.drain_mem.clone()),
                size,
            )
        }

        fn prepare(&self, cursor: &BatchCursor) -> Option<PreparedBatch> {
            match cursor
                .prepare_current_batch(&self.registry, &self.working)
                .unwrap()
            {
                PrepareOutcome::Prepared(batch) => Some(batch),
                PrepareOutcome::NoMoreWork { .. } => None,
            }
        }
    }

    #[test]
    fn test_twenty_five_links_in_batches_of_ten() {
        let fx = Fixture::new(25);
        let cursor = fx.cursor(10);

        let mut sizes = Vec::new();
        for _ in 0..3 {
            let batch = fx.prepare(&cursor).unwrap();
            sizes.push(batch.records.len());
            cursor.advance(&fx.registry).unwrap();
        }
        assert_eq!(sizes, vec![10, 10, 5]);

        let status = cursor.status(&fx.registry).unwrap();
        assert_eq!(status.current_batch, 3);
        assert_eq!(status.total_batches, 3);
        assert_eq!(status.links_processed, 25);
        assert_eq!(status.links_remaining, 0);
        assert!(status.is_complete());
        assert_eq!(fx.prepare(&cursor), None);
    }

    #[test]
    fn test_batches_cover_every_line_once_in_order() {
        for len in 0..=23 {
            for size in 1..=7 {
                let fx = Fixture::new(len);
                let cursor = fx.cursor(size);
                let mut seen = Vec::new();

                while let Some(batch) = fx.prepare(&cursor) {
                    assert!(batch.records.len() <= size);
                    seen.extend(batch.records.into_iter().map(|r| r.url));
                    if let AdvanceOutcome::Exhausted { .. } = cursor.advance(&fx.registry).unwrap()
                    {
                        break;
                    }
                }

                let expected: Vec<String> = fx
                    .registry
                    .load()
                    .unwrap()
                    .into_iter()
                    .map(|r| r.url)
                    .collect();
                assert_eq!(seen, expected, "len={len} size={size}");
            }
        }
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let fx = Fixture::new(12);
        let cursor = fx.cursor(5);

        let first = fx.prepare(&cursor).unwrap();
        let written = fx.working_mem.snapshot();
        let second = fx.prepare(&cursor).unwrap();

        assert_eq!(first, second);
        assert_eq!(written, fx.working_mem.snapshot());
        assert_eq!(first.line_range(), (1, 5));
    }

    #[test]
    fn test_cursor_initialised_to_one() {
        let fx = Fixture::new(3);
        let cursor = fx.cursor(10);
        assert_eq!(cursor.peek_batch().unwrap(), 1);
        assert_eq!(fx.cursor_mem.snapshot(), None);
        assert_eq!(cursor.current_batch().unwrap(), 1);
        assert_eq!(fx.cursor_mem.snapshot().as_deref(), Some("1"));
    }

    #[test]
    fn test_advance_past_last_batch_leaves_cursor() {
        let fx = Fixture::new(10);
        let cursor = fx.cursor(10);
        let outcome = cursor.advance(&fx.registry).unwrap();
        assert_eq!(
            outcome,
            AdvanceOutcome::Exhausted {
                batch: 1,
                total_links: 10
            }
        );
        assert_eq!(cursor.current_batch().unwrap(), 1);
        assert_eq!(cursor.drained_through().unwrap(), 10);
    }

    #[test]
    fn test_appended_links_reopen_only_new_lines() {
        let fx = Fixture::new(7);
        let cursor = fx.cursor(5);
        fx.prepare(&cursor).unwrap();
        cursor.advance(&fx.registry).unwrap();
        fx.prepare(&cursor).unwrap();
        assert!(matches!(
            cursor.advance(&fx.registry).unwrap(),
            AdvanceOutcome::Exhausted { .. }
        ));

        let mut text = fx.registry_mem.snapshot().unwrap();
        text.push_str("https://example.com/reel/8\nhttps://example.com/reel/9\n");
        fx.registry_mem.write(&text).unwrap();

        let status = cursor.status(&fx.registry).unwrap();
        assert_eq!(status.links_remaining, 2);

        let batch = fx.prepare(&cursor).unwrap();
        assert_eq!(batch.batch, 2);
        assert_eq!(batch.start, 7);
        let urls: Vec<_> = batch.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/reel/8", "https://example.com/reel/9"]);
    }

    #[test]
    fn test_links_appended_at_batch_boundary_open_next_batch() {
        let fx = Fixture::new(10);
        let cursor = fx.cursor(10);
        fx.prepare(&cursor).unwrap();
        assert!(matches!(
            cursor.advance(&fx.registry).unwrap(),
            AdvanceOutcome::Exhausted { batch: 1, .. }
        ));
        assert_eq!(fx.prepare(&cursor), None);

        let mut text = fx.registry_mem.snapshot().unwrap();
        for i in 11..=15 {
            text.push_str(&format!("https://example.com/reel/{i}\n"));
        }
        fx.registry_mem.write(&text).unwrap();

        let batch = fx.prepare(&cursor).unwrap();
        assert_eq!(batch.batch, 2);
        assert_eq!(batch.line_range(), (11, 15));
        assert_eq!(cursor.current_batch().unwrap(), 2);

        // Stable across repeated prepares.
        assert_eq!(fx.prepare(&cursor), Some(batch));

        assert!(matches!(
            cursor.advance(&fx.registry).unwrap(),
            AdvanceOutcome::Exhausted { batch: 2, total_links: 15 }
        ));
        assert!(cursor.status(&fx.registry).unwrap().is_complete());
    }

    #[test]
    fn test_annotated_lines_are_copied_but_not_processable() {
        let fx = Fixture::new(3);
        fx.registry
            .annotate("https://example.com/reel/2", &Annotation::LargeFile)
            .unwrap();
        let cursor = fx.cursor(10);
        let batch = fx.prepare(&cursor).unwrap();
        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.processable().count(), 2);
        assert!(fx
            .working_mem
            .snapshot()
            .unwrap()
            .contains("https://example.com/reel/2 - LARGE FILE"));

        let status = cursor.status(&fx.registry).unwrap();
        assert_eq!(status.annotated_links, 1);
    }

    #[test]
    fn test_missing_registry() {
        let fx = Fixture::new(0);
        let registry = LinkRegistry::new(Arc::new(MemoryStore::new("absent")));
        let cursor = fx.cursor(10);

        assert!(matches!(
            cursor.prepare_current_batch(&registry, &fx.working),
            Err(RegistryError::Missing { .. })
        ));
        let status = cursor.status(&registry).unwrap();
        assert_eq!(status.total_links, 0);
        assert_eq!(status.total_batches, 0);
        assert_eq!(status.percent_complete, 0.0);
    }

    #[test]
    fn test_corrupt_cursor_aborts() {
        let fx = Fixture::new(3);
        fx.cursor_mem.write("two").unwrap();
        let cursor = fx.cursor(10);
        let err = cursor
            .prepare_current_batch(&fx.registry, &fx.working)
            .unwrap_err();
        assert!(err.is_corruption());

        fx.cursor_mem.write("0").unwrap();
        assert!(cursor.current_batch().unwrap_err().is_corruption());
    }

    #[test]
    fn test_status_mid_run() {
        let fx = Fixture::new(25);
        let cursor = fx.cursor(10);
        cursor.advance(&fx.registry).unwrap();
        let status = cursor.status(&fx.registry).unwrap();
        assert_eq!(status.current_batch, 2);
        assert_eq!(status.links_processed, 10);
        assert_eq!(status.links_remaining, 15);
        assert!((status.percent_complete - 40.0).abs() < f64::EPSILON);
    }
}
