//! Mock content fetcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::fetcher::{ContentFetcher, FetchError};

/// What the mock does on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchBehavior {
    /// Report failure without touching the directory.
    Fail(String),
    /// Create `name` in the destination with the given (sparse) size.
    Produce { name: String, size: u64 },
    /// Report success but create nothing.
    SucceedWithoutFile,
}

impl FetchBehavior {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }

    pub fn produce(name: impl Into<String>, size: u64) -> Self {
        Self::Produce {
            name: name.into(),
            size,
        }
    }
}

/// A recorded fetch call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub url: String,
    pub dest_dir: PathBuf,
    pub behavior: FetchBehavior,
}

/// Mock implementation of the ContentFetcher trait.
///
/// Each URL may have a script of behaviors consumed one per call; once a
/// script runs out (or for unscripted URLs) the default behavior applies.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    default: Arc<RwLock<FetchBehavior>>,
    scripts: Arc<RwLock<HashMap<String, VecDeque<FetchBehavior>>>>,
    calls: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new(FetchBehavior::produce("clip.mp4", 1024))
    }
}

impl MockFetcher {
    /// Create a mock whose unscripted calls behave like `default`.
    pub fn new(default: FetchBehavior) -> Self {
        Self {
            default: Arc::new(RwLock::new(default)),
            scripts: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue behaviors for a URL.
    pub async fn script(&self, url: &str, behaviors: Vec<FetchBehavior>) {
        self.scripts
            .write()
            .await
            .entry(url.to_string())
            .or_default()
            .extend(behaviors);
    }

    /// Make every call for `url` behave the same, `times` times.
    pub async fn repeat(&self, url: &str, behavior: FetchBehavior, times: usize) {
        self.script(url, vec![behavior; times]).await;
    }

    pub async fn set_default(&self, behavior: FetchBehavior) {
        *self.default.write().await = behavior;
    }

    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls_for(&self, url: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.url == url)
            .count()
    }

    async fn next_behavior(&self, url: &str) -> FetchBehavior {
        let scripted = self
            .scripts
            .write()
            .await
            .get_mut(url)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(behavior) => behavior,
            None => self.default.read().await.clone(),
        }
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), FetchError> {
        let behavior = self.next_behavior(url).await;
        self.calls.write().await.push(RecordedFetch {
            url: url.to_string(),
            dest_dir: dest_dir.to_path_buf(),
            behavior: behavior.clone(),
        });

        match behavior {
            FetchBehavior::Fail(reason) => Err(FetchError::Rejected(reason)),
            FetchBehavior::SucceedWithoutFile => Ok(()),
            FetchBehavior::Produce { name, size } => {
                fs::create_dir_all(dest_dir)
                    .await
                    .map_err(|e| FetchError::io(dest_dir, e))?;
                let path = dest_dir.join(name);
                let file = fs::File::create(&path)
                    .await
                    .map_err(|e| FetchError::io(&path, e))?;
                file.set_len(size)
                    .await
                    .map_err(|e| FetchError::io(&path, e))?;
                Ok(())
            }
        }
    }
}
