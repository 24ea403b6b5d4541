//! Keep-or-discard decision for one artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{info, warn};

use crate::config::TriageConfig;
use crate::metrics;
use crate::placer::Placer;
use crate::registry::{Annotation, LinkRegistry};

use super::error::TriageError;
use super::types::{TriageOutcome, VideoArtifact};

/// Applies the size threshold and commits or discards artifacts.
pub struct ArtifactTriage {
    config: TriageConfig,
    holding_dir: PathBuf,
    final_store: PathBuf,
    registry: LinkRegistry,
    working_set: LinkRegistry,
    placer: Arc<dyn Placer>,
}

impl ArtifactTriage {
    pub fn new(
        config: TriageConfig,
        holding_dir: impl Into<PathBuf>,
        final_store: impl Into<PathBuf>,
        registry: LinkRegistry,
        working_set: LinkRegistry,
        placer: Arc<dyn Placer>,
    ) -> Self {
        Self {
            config,
            holding_dir: holding_dir.into(),
            final_store: final_store.into(),
            registry,
            working_set,
            placer,
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Final-store path an id is committed under.
    pub fn final_path(&self, id: u64) -> PathBuf {
        self.final_store.join(self.config.canonical_name(id))
    }

    /// Resolves the artifact at `produced` for `(url, id)`.
    ///
    /// An oversized artifact is annotated in the master registry and the
    /// working set before its file is deleted, so an interruption can leave
    /// an orphan in the holding directory but never an annotated URL whose
    /// artifact sits in the final store.
    pub async fn triage(
        &self,
        produced: &Path,
        url: &str,
        id: u64,
    ) -> Result<TriageOutcome, TriageError> {
        let canonical = self.holding_dir.join(self.config.canonical_name(id));

        if produced != canonical {
            fs::rename(produced, &canonical)
                .await
                .map_err(|e| TriageError::from_io(produced.to_path_buf(), e))?;
        }

        let size_bytes = fs::metadata(&canonical)
            .await
            .map_err(|e| TriageError::from_io(canonical.clone(), e))?
            .len();

        if size_bytes > self.config.max_size_bytes {
            return self.discard(canonical, size_bytes, url, id).await;
        }

        let destination = self.final_path(id);
        let placed = self.placer.place(&canonical, &destination).await?;
        metrics::BYTES_COMMITTED.inc_by(placed.size_bytes);

        info!(
            url,
            id,
            path = %placed.destination.display(),
            size_bytes = placed.size_bytes,
            "artifact kept"
        );

        Ok(TriageOutcome::Kept {
            artifact: VideoArtifact {
                path: placed.destination,
                size_bytes: placed.size_bytes,
            },
        })
    }

    async fn discard(
        &self,
        path: PathBuf,
        size_bytes: u64,
        url: &str,
        id: u64,
    ) -> Result<TriageOutcome, TriageError> {
        let annotation = Annotation::LargeFile;
        let annotated_lines = self.registry.annotate(url, &annotation)?
            + self.working_set.annotate(url, &annotation)?;

        if annotated_lines == 0 {
            warn!(url, "oversized artifact's URL not found in any registry");
        }

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TriageError::Io { path, source: e }),
        }

        info!(
            url,
            id,
            size_bytes,
            threshold = self.config.max_size_bytes,
            "artifact over size threshold, discarded"
        );

        Ok(TriageOutcome::Discarded {
            artifact: VideoArtifact { path, size_bytes },
            annotated_lines,
        })
    }
}
