//! The batch run state machine.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::batch::{AdvanceOutcome, BatchCursor, BatchStatus, PrepareOutcome};
use crate::config::Config;
use crate::fetcher::{ArtifactLocator, ContentFetcher, MediaFileLocator};
use crate::metrics;
use crate::placer::{FsPlacer, Placer};
use crate::registry::LinkRegistry;
use crate::retry::{RetryOrchestrator, RetryPolicy, Sleeper};
use crate::sequence::SequenceCounter;
use crate::store::FileStore;
use crate::triage::ArtifactTriage;

use super::error::DriverError;
use super::types::{BatchReport, DriverPhase};

/// Runs one batch per invocation.
pub struct BatchDriver {
    registry: LinkRegistry,
    working_set: LinkRegistry,
    cursor: BatchCursor,
    counter: SequenceCounter,
    orchestrator: RetryOrchestrator,
    auto_advance: bool,
}

impl BatchDriver {
    pub fn new(
        registry: LinkRegistry,
        working_set: LinkRegistry,
        cursor: BatchCursor,
        counter: SequenceCounter,
        orchestrator: RetryOrchestrator,
    ) -> Self {
        Self {
            registry,
            working_set,
            cursor,
            counter,
            orchestrator,
            auto_advance: false,
        }
    }

    /// Advance the cursor after `BatchDone` within the same run.
    pub fn with_auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    /// Wires file-backed stores, the filesystem placer and the default
    /// locator from configuration.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn ContentFetcher>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let paths = &config.paths;
        let registry = LinkRegistry::new(Arc::new(FileStore::new(&paths.registry)));
        let working_set = LinkRegistry::new(Arc::new(FileStore::new(&paths.working_set)));
        let cursor = BatchCursor::new(
            Arc::new(FileStore::new(&paths.cursor)),
            Arc::new(FileStore::new(&paths.drain_marker)),
            config.batch.size,
        );
        let counter = SequenceCounter::new(Arc::new(FileStore::new(&paths.counter)));

        let placer: Arc<dyn Placer> = Arc::new(FsPlacer::with_defaults());
        let locator: Arc<dyn ArtifactLocator> =
            Arc::new(MediaFileLocator::new(config.triage.extension.clone()));
        let triage = ArtifactTriage::new(
            config.triage.clone(),
            &paths.holding_dir,
            &paths.final_store,
            registry.clone(),
            working_set.clone(),
            placer,
        );
        let orchestrator = RetryOrchestrator::new(
            fetcher,
            locator,
            triage,
            RetryPolicy::from_config(&config.retry),
            sleeper,
            &paths.holding_dir,
        )
        .with_settle(config.fetcher.settle());

        Self::new(registry, working_set, cursor, counter, orchestrator)
            .with_auto_advance(config.batch.auto_advance)
    }

    pub fn cursor(&self) -> &BatchCursor {
        &self.cursor
    }

    pub fn registry(&self) -> &LinkRegistry {
        &self.registry
    }

    pub fn status(&self) -> Result<BatchStatus, DriverError> {
        Ok(self.cursor.status(&self.registry)?)
    }

    pub fn prepare(&self) -> Result<PrepareOutcome, DriverError> {
        Ok(self
            .cursor
            .prepare_current_batch(&self.registry, &self.working_set)?)
    }

    pub fn advance(&self) -> Result<AdvanceOutcome, DriverError> {
        Ok(self.cursor.advance(&self.registry)?)
    }

    /// Runs the batch the cursor currently names.
    pub async fn run_current_batch(&self) -> Result<BatchReport, DriverError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch_run", %run_id);
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: Uuid) -> Result<BatchReport, DriverError> {
        let clock = Instant::now();
        let batch = self.cursor.current_batch()?;
        let mut report = BatchReport::new(run_id, batch, Utc::now());
        info!(batch, phase = %report.phase, "batch run starting");

        let prepared = match self.prepare()? {
            PrepareOutcome::Prepared(prepared) => prepared,
            PrepareOutcome::NoMoreWork { .. } => {
                report.phase = DriverPhase::Exhausted;
                report.finished_at = Utc::now();
                info!(batch, "no work left, nothing to run");
                return Ok(report);
            }
        };
        report.batch = prepared.batch;
        report.phase = DriverPhase::BatchPrepared;

        let (first_line, last_line) = prepared.line_range();
        info!(
            batch = prepared.batch,
            links = prepared.records.len(),
            processable = prepared.processable().count(),
            first_line,
            last_line,
            "processing batch"
        );
        report.phase = DriverPhase::Processing;

        for (position, record) in prepared.records.iter().enumerate() {
            if !record.is_processable() {
                info!(url = %record.url, annotation = ?record.annotation, "skipping annotated entry");
                report.skipped += 1;
                continue;
            }

            // A previous run's triage may have annotated the master registry
            // after this working set was written.
            if let Some(master) = self.registry.find(&record.url)? {
                if !master.is_processable() {
                    info!(url = %record.url, "skipping entry annotated in registry");
                    report.skipped += 1;
                    continue;
                }
            }

            let id = self.counter.next()?;
            info!(
                url = %record.url,
                id,
                position = position + 1,
                of = prepared.records.len(),
                "processing link"
            );
            let resolution = self.orchestrator.run_with_retry(&record.url, id).await?;
            report.record(resolution);
        }

        report.phase = DriverPhase::BatchDone;

        if self.auto_advance {
            let outcome = self.advance()?;
            report.phase = match outcome {
                AdvanceOutcome::Advanced { .. } => DriverPhase::Advanced,
                AdvanceOutcome::Exhausted { .. } => DriverPhase::Exhausted,
            };
            report.advance = Some(outcome);
        }

        report.finished_at = Utc::now();
        metrics::BATCH_DURATION.observe(clock.elapsed().as_secs_f64());

        if report.failed > 0 {
            warn!(
                batch = report.batch,
                failed = report.failed,
                "some links exhausted their retries and stay unannotated"
            );
        }
        info!(
            batch = report.batch,
            phase = %report.phase,
            processed = report.processed,
            kept = report.kept,
            oversized = report.oversized,
            failed = report.failed,
            skipped = report.skipped,
            bytes_committed = report.bytes_committed,
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "batch run finished"
        );

        Ok(report)
    }
}
