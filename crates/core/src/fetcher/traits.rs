//! Trait definitions for content fetchers.

use std::path::Path;

use async_trait::async_trait;

use super::error::FetchError;

/// Something that can retrieve the media behind a URL into a directory.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Attempts to produce one media file for `url` inside `dest_dir`.
    ///
    /// `Ok` means the fetcher believes it finished; a file is expected but not
    /// guaranteed to exist afterwards.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), FetchError>;
}
