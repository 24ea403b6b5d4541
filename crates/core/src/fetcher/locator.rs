//! Locating the artifact a fetcher produced.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::error::FetchError;

/// Strategy for finding the file a fetch attempt produced.
#[async_trait]
pub trait ArtifactLocator: Send + Sync {
    /// Returns the name of this locator implementation.
    fn name(&self) -> &str;

    /// The freshest artifact in `dir`, if any. A missing directory has none.
    async fn locate(&self, dir: &Path) -> Result<Option<PathBuf>, FetchError>;

    /// Removes every leftover artifact (and in-progress download) from `dir`.
    /// Returns the number of files removed.
    async fn purge(&self, dir: &Path) -> Result<usize, FetchError>;
}

/// Suffixes of downloads that have not finished.
const IN_PROGRESS_SUFFIXES: &[&str] = &[".part", ".crdownload", ".tmp", ".partial"];

/// Placeholder some downloaders write when the media could not be resolved.
const PLACEHOLDER_NAME: &str = "null";

/// Default locator: accepts inconsistently named media output.
///
/// A file qualifies when it ends in the media extension, mentions the
/// extension anywhere in its name, or has no extension at all. Hidden files,
/// placeholder output and in-progress downloads never qualify. Among
/// candidates the most recently created wins.
#[derive(Debug, Clone)]
pub struct MediaFileLocator {
    extension: String,
}

impl Default for MediaFileLocator {
    fn default() -> Self {
        Self::new("mp4")
    }
}

impl MediaFileLocator {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    fn is_in_progress(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        IN_PROGRESS_SUFFIXES.iter().any(|s| lower.ends_with(s))
    }

    /// Whether a file name looks like finished media output.
    pub fn is_candidate(&self, name: &str) -> bool {
        if name.starts_with('.') || Self::is_in_progress(name) {
            return false;
        }

        let lower = name.to_ascii_lowercase();
        let path = Path::new(&lower);
        if path.file_stem().and_then(|s| s.to_str()) == Some(PLACEHOLDER_NAME)
            && path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
        {
            return false;
        }

        match path.extension().and_then(|e| e.to_str()) {
            None => true,
            Some(ext) if ext == self.extension => true,
            Some(_) => lower.contains(&self.extension),
        }
    }

    async fn scan(&self, dir: &Path) -> Result<Vec<(PathBuf, String, SystemTime)>, FetchError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FetchError::io(dir, e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FetchError::io(dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Removed between listing and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(FetchError::io(entry.path(), e)),
            };
            if !meta.is_file() {
                continue;
            }
            let stamp = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((entry.path(), name, stamp));
        }
        Ok(found)
    }
}

#[async_trait]
impl ArtifactLocator for MediaFileLocator {
    fn name(&self) -> &str {
        "media-file"
    }

    async fn locate(&self, dir: &Path) -> Result<Option<PathBuf>, FetchError> {
        let newest = self
            .scan(dir)
            .await?
            .into_iter()
            .filter(|(_, name, _)| self.is_candidate(name))
            .max_by(|a, b| a.2.cmp(&b.2).then_with(|| a.1.cmp(&b.1)))
            .map(|(path, _, _)| path);

        debug!(dir = %dir.display(), found = ?newest, "artifact scan");
        Ok(newest)
    }

    async fn purge(&self, dir: &Path) -> Result<usize, FetchError> {
        let mut removed = 0;
        for (path, name, _) in self.scan(dir).await? {
            if !(self.is_candidate(&name) || Self::is_in_progress(&name)) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(FetchError::io(&path, e)),
            }
        }
        if removed > 0 {
            warn!(dir = %dir.display(), removed, "purged leftover files from holding directory");
        }
        Ok(removed)
    }
}
