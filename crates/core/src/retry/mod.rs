//! Per-URL retry loop.
//!
//! Each URL gets a bounded number of fetch attempts. An attempt succeeds only
//! when the fetcher reports completion and the locator finds an artifact that
//! triage then resolves; everything else is retried after the policy's delay.

mod orchestrator;
mod policy;
mod sleeper;
mod types;

pub use orchestrator::RetryOrchestrator;
pub use policy::{Backoff, RetryPolicy};
pub use sleeper::{Sleeper, TokioSleeper};
pub use types::{AttemptOutcome, DownloadAttempt, Resolution, UrlResolution};
