//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable content fetcher and a sleeper that
//! records instead of waiting, so batch runs can be exercised end to end
//! without network access or real delays.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelbatch_core::testing::{FetchBehavior, MockFetcher, RecordingSleeper};
//!
//! let fetcher = MockFetcher::new(FetchBehavior::produce("clip.mp4", 1024));
//! fetcher.script("https://example.com/flaky", vec![FetchBehavior::fail("timeout")]).await;
//!
//! let sleeper = RecordingSleeper::new();
//! // Wire both into a RetryOrchestrator...
//! assert_eq!(fetcher.call_count().await, 1);
//! ```

mod mock_fetcher;
mod recording_sleeper;

pub use mock_fetcher::{FetchBehavior, MockFetcher, RecordedFetch};
pub use recording_sleeper::RecordingSleeper;
