use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::metrics;

use super::error::ArchiveError;

/// Result of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    /// Archives found.
    pub archives: usize,
    /// Media entries written to the final store.
    pub extracted: usize,
    /// Media entries whose destination already existed.
    pub skipped_existing: usize,
    /// Archives that could not be read (fully or partly).
    pub failed_archives: Vec<String>,
}

/// Extracts every `.<extension>` entry of every `*.zip` in `archives_dir`
/// into `final_store`, flattened to the entry's file name.
///
/// Archives are processed in name order. Existing files are never
/// overwritten, and each entry is written to a `.partial` sibling before
/// being renamed into place.
pub async fn extract_archives(
    archives_dir: &Path,
    final_store: &Path,
    extension: &str,
) -> Result<ExtractionReport, ArchiveError> {
    let archives_dir = archives_dir.to_path_buf();
    let final_store = final_store.to_path_buf();
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();

    // zip reads are blocking
    tokio::task::spawn_blocking(move || extract_blocking(&archives_dir, &final_store, &extension))
        .await
        .map_err(|e| ArchiveError::Join(e.to_string()))?
}

fn extract_blocking(
    archives_dir: &Path,
    final_store: &Path,
    extension: &str,
) -> Result<ExtractionReport, ArchiveError> {
    if !archives_dir.is_dir() {
        return Err(ArchiveError::ArchivesDirMissing {
            path: archives_dir.to_path_buf(),
        });
    }
    fs::create_dir_all(final_store).map_err(|e| ArchiveError::io(final_store, e))?;

    let archives = detect_zip_files(archives_dir)?;
    let mut report = ExtractionReport {
        archives: archives.len(),
        ..ExtractionReport::default()
    };

    if archives.is_empty() {
        info!(dir = %archives_dir.display(), "no zip files found");
        return Ok(report);
    }
    info!(count = archives.len(), dest = %final_store.display(), "extracting archives");

    for archive_path in archives {
        let name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match extract_one(&archive_path, final_store, extension, &mut report) {
            Ok(count) => info!(archive = %name, extracted = count, "archive extracted"),
            Err(e) => {
                warn!(archive = %name, error = %e, "failed to extract archive");
                report.failed_archives.push(name);
            }
        }
    }

    info!(
        archives = report.archives,
        extracted = report.extracted,
        skipped_existing = report.skipped_existing,
        failed = report.failed_archives.len(),
        "extraction complete"
    );
    Ok(report)
}

fn detect_zip_files(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archives = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))? {
        let entry = entry.map_err(|e| ArchiveError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let is_zip = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if is_zip {
            archives.push(path);
        }
    }
    archives.sort();
    debug!("found {} ZIP archive(s)", archives.len());
    Ok(archives)
}

/// Extracts one archive. Entries already written stay written if a later
/// entry fails.
fn extract_one(
    archive_path: &Path,
    final_store: &Path,
    extension: &str,
    report: &mut ExtractionReport,
) -> Result<usize, String> {
    let file = File::open(archive_path).map_err(|e| format!("failed to open: {e}"))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("failed to read ZIP archive: {e}"))?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| format!("failed to read ZIP entry {index}: {e}"))?;

        if entry.is_dir() {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name())
            .map(|n| n.to_os_string())
        else {
            warn!(entry = entry.name(), "skipping entry with unsafe path");
            continue;
        };

        let is_media = Path::new(&file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !is_media {
            continue;
        }

        let destination = final_store.join(&file_name);
        if destination.exists() {
            debug!(path = %destination.display(), "already present, skipping");
            report.skipped_existing += 1;
            metrics::ARCHIVE_ENTRIES
                .with_label_values(&["skipped_existing"])
                .inc();
            continue;
        }

        let mut partial_name = file_name.clone();
        partial_name.push(".partial");
        let partial = final_store.join(partial_name);

        let written = File::create(&partial)
            .and_then(|mut out| {
                io::copy(&mut entry, &mut out)?;
                out.sync_all()
            })
            .and_then(|()| fs::rename(&partial, &destination));

        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(format!("failed to extract {}: {e}", entry.name()));
        }

        report.extracted += 1;
        extracted += 1;
        metrics::ARCHIVE_ENTRIES.with_label_values(&["extracted"]).inc();
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extracts_flattened_media() {
        let temp = TempDir::new().unwrap();
        let archives = temp.path().join("archives");
        let store = temp.path().join("VIDEOS");
        fs::create_dir_all(&archives).unwrap();

        write_zip(
            &archives.join("a.zip"),
            &[
                ("reels/Video_1.mp4", "one"),
                ("reels/readme.txt", "skip"),
                ("Video_2.MP4", "two"),
            ],
        );
        write_zip(&archives.join("b.zip"), &[("deep/er/Video_3.mp4", "three")]);

        let report = extract_archives(&archives, &store, "mp4").await.unwrap();

        assert_eq!(report.archives, 2);
        assert_eq!(report.extracted, 3);
        assert!(report.failed_archives.is_empty());
        assert_eq!(fs::read(store.join("Video_1.mp4")).unwrap(), b"one");
        assert_eq!(fs::read(store.join("Video_3.mp4")).unwrap(), b"three");
        assert!(!store.join("readme.txt").exists());
        assert!(!store.join("reels").exists());
    }

    #[tokio::test]
    async fn test_existing_files_untouched_and_broken_archive_counted() {
        let temp = TempDir::new().unwrap();
        let archives = temp.path().join("archives");
        let store = temp.path().join("VIDEOS");
        fs::create_dir_all(&archives).unwrap();
        fs::create_dir_all(&store).unwrap();

        fs::write(store.join("Video_1.mp4"), b"original").unwrap();
        write_zip(&archives.join("a.zip"), &[("Video_1.mp4", "replacement")]);
        fs::write(archives.join("broken.zip"), b"not a zip").unwrap();

        let report = extract_archives(&archives, &store, "mp4").await.unwrap();

        assert_eq!(report.archives, 2);
        assert_eq!(report.extracted, 0);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.failed_archives, vec!["broken.zip".to_string()]);
        assert_eq!(fs::read(store.join("Video_1.mp4")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_missing_archives_dir() {
        let temp = TempDir::new().unwrap();
        let err = extract_archives(&temp.path().join("nope"), temp.path(), "mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::ArchivesDirMissing { .. }));
    }
}
