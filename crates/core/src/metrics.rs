//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fetch attempts and per-URL resolutions
//! - Artifact placement
//! - Batch runs and archive extraction
//!
//! The process is short-lived, so metrics are exported by rendering the
//! registry to a textfile (node_exporter textfile collector format) rather
//! than served.

use std::path::Path;

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        // Each collector is registered exactly once, here.
        let _ = registry.register(metric);
    }
    registry
});

// =============================================================================
// Fetching
// =============================================================================

/// Fetch attempts by result.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelbatch_fetch_attempts_total", "Total fetch attempts"),
        &["result"], // "artifact", "no_artifact", "error", "source_missing"
    )
    .expect("metric definition")
});

/// URL resolutions by outcome.
pub static URL_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelbatch_url_resolutions_total", "URLs resolved"),
        &["outcome"], // "kept", "oversized", "failed"
    )
    .expect("metric definition")
});

// =============================================================================
// Placement
// =============================================================================

/// Bytes committed to the final store.
pub static BYTES_COMMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelbatch_bytes_committed_total",
        "Bytes moved into the final store",
    )
    .expect("metric definition")
});

/// Leftover files purged from the holding directory.
pub static HOLDING_FILES_PURGED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelbatch_holding_files_purged_total",
        "Leftover files removed from the holding directory",
    )
    .expect("metric definition")
});

// =============================================================================
// Batches and archives
// =============================================================================

/// Wall-clock duration of a batch run.
pub static BATCH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "reelbatch_batch_duration_seconds",
            "Duration of one batch run",
        )
        .buckets(vec![10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0]),
    )
    .expect("metric definition")
});

/// Archive entries by result.
pub static ARCHIVE_ENTRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelbatch_archive_entries_total",
            "Media entries seen while extracting archives",
        ),
        &["result"], // "extracted", "skipped_existing"
    )
    .expect("metric definition")
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(URL_RESOLUTIONS.clone()),
        Box::new(BYTES_COMMITTED.clone()),
        Box::new(HOLDING_FILES_PURGED.clone()),
        Box::new(BATCH_DURATION.clone()),
        Box::new(ARCHIVE_ENTRIES.clone()),
    ]
}

/// Prometheus text exposition of every core metric.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!(error = %e, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Writes `render()` to `path` through a sibling temp file and rename.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    std::fs::write(&tmp, render())?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_contains_core_metrics() {
        URL_RESOLUTIONS.with_label_values(&["kept"]).inc();
        FETCH_ATTEMPTS.with_label_values(&["artifact"]).inc();
        let text = render();
        assert!(text.contains("reelbatch_url_resolutions_total"));
        assert!(text.contains("reelbatch_fetch_attempts_total"));
    }

    #[test]
    fn test_write_textfile() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/reelbatch.prom");
        BYTES_COMMITTED.inc_by(3);
        write_textfile(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("reelbatch_bytes_committed_total"));
        assert!(!temp.path().join("nested/reelbatch.prom.tmp").exists());
    }
}
