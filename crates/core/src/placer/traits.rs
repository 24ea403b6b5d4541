//! Trait definitions for the placer module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use super::error::PlacerError;

/// A file that has been committed to its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedFile {
    pub destination: PathBuf,
    pub size_bytes: u64,
    /// `false` when the cross-device copy path was taken.
    pub renamed: bool,
}

/// A placer that can move files to their final destinations.
#[async_trait]
pub trait Placer: Send + Sync {
    /// Returns the name of this placer implementation.
    fn name(&self) -> &str;

    /// Moves `source` to `destination`.
    ///
    /// On success the source no longer exists and the destination holds the
    /// complete file. On failure nothing new appears under the destination
    /// name.
    async fn place(&self, source: &Path, destination: &Path) -> Result<PlacedFile, PlacerError>;
}
