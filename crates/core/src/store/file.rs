//! File-backed store with atomic whole-file rewrite.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{StoreError, TextStore};

/// A `TextStore` backed by a single file.
///
/// Writes go to a sibling temporary file which is flushed and then renamed
/// over the target, so a crash leaves either the old or the new document.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store for the given path. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TextStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(self.location(), e)),
        };

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| StoreError::InvalidUtf8 {
                location: self.location(),
            })
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(self.location(), e))?;
            }
        }

        let temp = self.temp_path();
        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::io(self.location(), e));
        }

        debug!(path = %self.path.display(), bytes = contents.len(), "store rewritten");
        Ok(())
    }
}
