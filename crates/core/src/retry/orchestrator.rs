//! Retry loop around fetch, locate and triage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::fetcher::{ArtifactLocator, ContentFetcher};
use crate::metrics;
use crate::triage::{ArtifactTriage, TriageError};

use super::policy::RetryPolicy;
use super::sleeper::Sleeper;
use super::types::{AttemptOutcome, DownloadAttempt, Resolution, UrlResolution};

/// Drives one URL through up to `max_attempts` fetches.
pub struct RetryOrchestrator {
    fetcher: Arc<dyn ContentFetcher>,
    locator: Arc<dyn ArtifactLocator>,
    triage: ArtifactTriage,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    holding_dir: PathBuf,
    settle: Duration,
}

impl RetryOrchestrator {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        locator: Arc<dyn ArtifactLocator>,
        triage: ArtifactTriage,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        holding_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            locator,
            triage,
            policy,
            sleeper,
            holding_dir: holding_dir.into(),
            settle: Duration::ZERO,
        }
    }

    /// Wait between a fetch reporting completion and scanning for its output.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn holding_dir(&self) -> &Path {
        &self.holding_dir
    }

    /// Resolves `url` using sequence id `id`.
    ///
    /// Per-attempt failures are retried and never surface as `Err`; an
    /// exhausted budget is `Resolution::Failed`. `Err` means storage trouble
    /// that should abort the run. The holding directory is cleared of
    /// candidate files before the first attempt and after the last.
    pub async fn run_with_retry(&self, url: &str, id: u64) -> Result<UrlResolution, TriageError> {
        self.clear_holding().await?;

        let mut attempts = Vec::new();
        let mut resolution = Resolution::Failed;

        for attempt_number in 1..=self.policy.max_attempts {
            let started_at = Utc::now();
            debug!(url, id, attempt = attempt_number, "fetch attempt starting");

            let outcome = match self.attempt(url, id).await {
                Ok((outcome, resolved)) => {
                    if let Some(resolved) = resolved {
                        resolution = resolved;
                    }
                    outcome
                }
                Err(e) => {
                    error!(url, id, attempt = attempt_number, error = %e, "storage failure, aborting URL");
                    return Err(e);
                }
            };

            let succeeded = matches!(outcome, AttemptOutcome::Success { .. });
            if let AttemptOutcome::TransientFailure { reason } | AttemptOutcome::FatalFailure { reason } =
                &outcome
            {
                warn!(
                    url,
                    id,
                    attempt = attempt_number,
                    max_attempts = self.policy.max_attempts,
                    reason = %reason,
                    "fetch attempt failed"
                );
            }

            attempts.push(DownloadAttempt {
                url: url.to_string(),
                attempt_number,
                started_at,
                outcome,
            });

            if succeeded {
                break;
            }

            if self.policy.allows_after(attempt_number) {
                let delay = self.policy.delay_after(attempt_number);
                debug!(url, attempt = attempt_number, delay_ms = delay.as_millis() as u64, "waiting before retry");
                self.sleeper.sleep(delay).await;
            }
        }

        self.clear_holding().await?;

        let result = UrlResolution {
            url: url.to_string(),
            id,
            resolution,
            attempts,
        };

        metrics::URL_RESOLUTIONS
            .with_label_values(&[result.label()])
            .inc();

        if result.is_resolved() {
            info!(url, id, outcome = result.label(), attempts = result.attempts.len(), "URL resolved");
        } else {
            error!(
                url,
                id,
                attempts = result.attempts.len(),
                "giving up on URL after exhausting retries"
            );
        }

        Ok(result)
    }

    /// One fetch, settle, locate, triage cycle.
    async fn attempt(
        &self,
        url: &str,
        id: u64,
    ) -> Result<(AttemptOutcome, Option<Resolution>), TriageError> {
        if let Err(e) = self.fetcher.fetch(url, &self.holding_dir).await {
            metrics::FETCH_ATTEMPTS.with_label_values(&["error"]).inc();
            return Ok((
                AttemptOutcome::TransientFailure {
                    reason: e.to_string(),
                },
                None,
            ));
        }

        if !self.settle.is_zero() {
            self.sleeper.sleep(self.settle).await;
        }

        let produced = match self.locator.locate(&self.holding_dir).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                metrics::FETCH_ATTEMPTS.with_label_values(&["no_artifact"]).inc();
                return Ok((
                    AttemptOutcome::TransientFailure {
                        reason: format!(
                            "{} reported success but no artifact appeared",
                            self.fetcher.name()
                        ),
                    },
                    None,
                ));
            }
            Err(e) => {
                metrics::FETCH_ATTEMPTS.with_label_values(&["error"]).inc();
                return Ok((
                    AttemptOutcome::TransientFailure {
                        reason: e.to_string(),
                    },
                    None,
                ));
            }
        };

        match self.triage.triage(&produced, url, id).await {
            Ok(outcome) => {
                metrics::FETCH_ATTEMPTS.with_label_values(&["artifact"]).inc();
                Ok((
                    AttemptOutcome::Success { path: produced },
                    Some(Resolution::from(outcome)),
                ))
            }
            // Fatal for this attempt only; the next attempt may still succeed.
            Err(e) if e.is_transient() => {
                metrics::FETCH_ATTEMPTS
                    .with_label_values(&["source_missing"])
                    .inc();
                Ok((
                    AttemptOutcome::FatalFailure {
                        reason: e.to_string(),
                    },
                    None,
                ))
            }
            Err(e) => Err(e),
        }
    }

    async fn clear_holding(&self) -> Result<(), TriageError> {
        let removed = self
            .locator
            .purge(&self.holding_dir)
            .await
            .map_err(TriageError::Cleanup)?;
        metrics::HOLDING_FILES_PURGED.inc_by(removed as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use crate::fetcher::MediaFileLocator;
    use crate::placer::FsPlacer;
    use crate::registry::LinkRegistry;
    use crate::store::MemoryStore;
    use crate::testing::{FetchBehavior, MockFetcher, RecordingSleeper};
    use tempfile::TempDir;

    const URL: &str = "https://example.com/reel/1";

    struct Fixture {
        temp: TempDir,
        fetcher: MockFetcher,
        sleeper: RecordingSleeper,
        registry_mem: MemoryStore,
    }

    impl Fixture {
        fn new(default: FetchBehavior) -> Self {
            Self {
                temp: TempDir::new().unwrap(),
                fetcher: MockFetcher::new(default),
                sleeper: RecordingSleeper::new(),
                registry_mem: MemoryStore::with_contents("all_links", format!("{URL}\n")),
            }
        }

        fn holding(&self) -> PathBuf {
            self.temp.path().join("temp")
        }

        fn store(&self) -> PathBuf {
            self.temp.path().join("VIDEOS")
        }

        fn orchestrator(&self, policy: RetryPolicy, max_size_bytes: u64) -> RetryOrchestrator {
            let triage = ArtifactTriage::new(
                TriageConfig {
                    max_size_bytes,
                    ..TriageConfig::default()
                },
                self.holding(),
                self.store(),
                LinkRegistry::new(Arc::new(self.registry_mem.clone())),
                LinkRegistry::new(Arc::new(MemoryStore::new("links"))),
                Arc::new(FsPlacer::with_defaults()),
            );
            RetryOrchestrator::new(
                Arc::new(self.fetcher.clone()),
                Arc::new(MediaFileLocator::default()),
                triage,
                policy,
                Arc::new(self.sleeper.clone()),
                self.holding(),
            )
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let fx = Fixture::new(FetchBehavior::produce("reel.mp4", 10));
        let orch = fx.orchestrator(RetryPolicy::default(), 1024);

        let result = orch.run_with_retry(URL, 1).await.unwrap();

        assert_eq!(result.label(), "kept");
        assert_eq!(result.attempts.len(), 1);
        assert!(fx.store().join("Video_1.mp4").exists());
        assert!(fx.sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_exhausts_budget_without_artifact() {
        let fx = Fixture::new(FetchBehavior::fail("page did not load"));
        let orch = fx.orchestrator(RetryPolicy::fixed(7, Duration::from_secs(5)), 1024);

        let result = orch.run_with_retry(URL, 1).await.unwrap();

        assert_eq!(result.resolution, Resolution::Failed);
        assert_eq!(fx.fetcher.call_count().await, 7);
        assert_eq!(result.attempts.len(), 7);
        // No wait after the final attempt.
        assert_eq!(fx.sleeper.sleeps(), vec![Duration::from_secs(5); 6]);
        assert_eq!(fx.sleeper.total(), Duration::from_secs(30));
        assert!(!fx.store().exists());
        assert_eq!(fx.registry_mem.write_count(), 0);
    }

    #[tokio::test]
    async fn test_success_without_file_is_retried() {
        let fx = Fixture::new(FetchBehavior::produce("reel.mp4", 10));
        fx.fetcher
            .script(
                URL,
                vec![
                    FetchBehavior::SucceedWithoutFile,
                    FetchBehavior::fail("timeout"),
                ],
            )
            .await;
        let orch = fx.orchestrator(RetryPolicy::fixed(7, Duration::from_millis(10)), 1024);

        let result = orch.run_with_retry(URL, 3).await.unwrap();

        assert!(result.is_resolved());
        assert_eq!(result.attempts.len(), 3);
        assert!(matches!(
            result.attempts[0].outcome,
            AttemptOutcome::TransientFailure { .. }
        ));
        assert_eq!(result.attempts[2].attempt_number, 3);
        assert!(fx.store().join("Video_3.mp4").exists());
    }

    #[tokio::test]
    async fn test_oversized_is_terminal_success() {
        let fx = Fixture::new(FetchBehavior::produce("big.mp4", 2048));
        let orch = fx.orchestrator(RetryPolicy::default(), 1024);

        let result = orch.run_with_retry(URL, 2).await.unwrap();

        assert_eq!(result.label(), "oversized");
        assert_eq!(fx.fetcher.call_count().await, 1);
        assert!(!fx.store().join("Video_2.mp4").exists());
        assert!(fx.registry_mem.snapshot().unwrap().contains("LARGE FILE"));
    }

    #[tokio::test]
    async fn test_stale_files_are_purged_between_urls() {
        let fx = Fixture::new(FetchBehavior::fail("nope"));
        std::fs::create_dir_all(fx.holding()).unwrap();
        std::fs::write(fx.holding().join("stale.mp4"), b"old").unwrap();
        let orch = fx.orchestrator(RetryPolicy::fixed(2, Duration::ZERO), 1024);

        let result = orch.run_with_retry(URL, 1).await.unwrap();

        assert_eq!(result.resolution, Resolution::Failed);
        assert!(!fx.holding().join("stale.mp4").exists());
        assert!(!fx.store().exists());
    }

    #[tokio::test]
    async fn test_settle_delay_precedes_scan() {
        let fx = Fixture::new(FetchBehavior::produce("reel.mp4", 1));
        let orch = fx
            .orchestrator(RetryPolicy::default(), 1024)
            .with_settle(Duration::from_millis(1500));

        orch.run_with_retry(URL, 1).await.unwrap();
        assert_eq!(fx.sleeper.sleeps(), vec![Duration::from_millis(1500)]);
    }
}
