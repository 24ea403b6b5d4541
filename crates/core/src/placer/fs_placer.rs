use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::config::PlacerConfig;
use super::error::{PlacerError, TransferStage};
use super::traits::{PlacedFile, Placer};

/// Commits files into a directory on the local filesystem.
pub struct FsPlacer {
    config: PlacerConfig,
}

impl FsPlacer {
    pub fn new(config: PlacerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default())
    }

    /// Sibling path a cross-device copy writes into before publishing.
    fn partial_path(destination: &Path) -> PathBuf {
        let mut name = destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("artifact"));
        name.push(".partial");
        destination.with_file_name(name)
    }

    fn crosses_devices(e: &std::io::Error) -> bool {
        // EXDEV is 18 on Linux
        e.kind() == ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
    }

    /// Returns `Ok(false)` when the rename would cross filesystems.
    async fn rename_into_place(source: &Path, destination: &Path) -> Result<bool, PlacerError> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) if Self::crosses_devices(&e) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PlacerError::SourceMissing {
                path: source.to_path_buf(),
            }),
            Err(e) => Err(PlacerError::transfer(
                TransferStage::Rename,
                source,
                destination,
                e,
            )),
        }
    }

    async fn write_partial(&self, source: &Path, partial: &Path) -> Result<u64, PlacerError> {
        let copy_err = |e| PlacerError::transfer(TransferStage::Copy, source, partial, e);

        let mut reader = File::open(source).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PlacerError::SourceMissing {
                    path: source.to_path_buf(),
                }
            } else {
                copy_err(e)
            }
        })?;
        let out = File::create(partial).await.map_err(copy_err)?;
        let mut writer = BufWriter::with_capacity(self.config.copy_buffer_bytes, out);

        let mut buffer = vec![0u8; self.config.copy_buffer_bytes.max(1)];
        let mut written = 0u64;
        loop {
            let n = reader.read(&mut buffer).await.map_err(copy_err)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n]).await.map_err(copy_err)?;
            written += n as u64;
        }

        writer.flush().await.map_err(copy_err)?;
        if self.config.sync_copies {
            writer.get_ref().sync_all().await.map_err(copy_err)?;
        }
        Ok(written)
    }

    /// Copy to `.partial`, publish it by rename, then drop the holding copy.
    async fn copy_and_publish(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let partial = Self::partial_path(destination);

        let size = match self.write_partial(source, &partial).await {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, destination).await {
            let _ = fs::remove_file(&partial).await;
            return Err(PlacerError::transfer(
                TransferStage::Publish,
                &partial,
                destination,
                e,
            ));
        }

        fs::remove_file(source)
            .await
            .map_err(|e| PlacerError::SourceNotRemoved {
                path: source.to_path_buf(),
                source: e,
            })?;

        Ok(size)
    }

    async fn ensure_store_dir(destination: &Path) -> Result<(), PlacerError> {
        let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PlacerError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })
    }
}

#[async_trait]
impl Placer for FsPlacer {
    fn name(&self) -> &str {
        "fs"
    }

    async fn place(&self, source: &Path, destination: &Path) -> Result<PlacedFile, PlacerError> {
        if !fs::try_exists(source).await? {
            return Err(PlacerError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        // rename(2) would silently replace an existing file
        if fs::try_exists(destination).await? {
            return Err(PlacerError::AlreadyCommitted {
                path: destination.to_path_buf(),
            });
        }

        Self::ensure_store_dir(destination).await?;

        let renamed =
            self.config.rename_first && Self::rename_into_place(source, destination).await?;

        let size_bytes = if renamed {
            fs::metadata(destination).await?.len()
        } else {
            if self.config.rename_first {
                warn!(
                    source = %source.display(),
                    destination = %destination.display(),
                    "holding dir is on another device, copying"
                );
            }
            self.copy_and_publish(source, destination).await?
        };

        debug!(
            destination = %destination.display(),
            size_bytes,
            renamed,
            "artifact committed"
        );

        Ok(PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes,
            renamed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rename_into_store() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("Video_1.mp4");
        let dest_path = temp.path().join("store/Video_1.mp4");

        fs::write(&source_path, "test content").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let placed = placer.place(&source_path, &dest_path).await.unwrap();

        assert!(placed.renamed);
        assert_eq!(placed.size_bytes, 12);
        assert!(dest_path.exists());
        assert!(!source_path.exists());
    }

    #[tokio::test]
    async fn test_copy_path_leaves_no_partial() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("Video_2.mp4");
        let dest_path = temp.path().join("store/Video_2.mp4");

        fs::write(&source_path, vec![7u8; 10_000]).await.unwrap();

        let placer = FsPlacer::new(PlacerConfig::default().copy_only().with_copy_buffer(1024));
        let placed = placer.place(&source_path, &dest_path).await.unwrap();

        assert!(!placed.renamed);
        assert_eq!(placed.size_bytes, 10_000);
        assert_eq!(fs::read(&dest_path).await.unwrap().len(), 10_000);
        assert!(!source_path.exists());
        assert!(!FsPlacer::partial_path(&dest_path).exists());
    }

    #[tokio::test]
    async fn test_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("Video_3.mp4");
        let dest_path = temp.path().join("store/Video_3.mp4");

        fs::create_dir_all(dest_path.parent().unwrap()).await.unwrap();
        fs::write(&source_path, "new").await.unwrap();
        fs::write(&dest_path, "committed earlier").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let err = placer.place(&source_path, &dest_path).await.unwrap_err();
        assert!(matches!(err, PlacerError::AlreadyCommitted { .. }));

        assert_eq!(
            fs::read_to_string(&dest_path).await.unwrap(),
            "committed earlier"
        );
        assert!(source_path.exists());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let placer = FsPlacer::with_defaults();
        let err = placer
            .place(&temp.path().join("gone.mp4"), &temp.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_source_missing());
        assert!(!temp.path().join("out.mp4").exists());
    }

    #[test]
    fn test_partial_path_is_sibling() {
        let partial = FsPlacer::partial_path(Path::new("/store/Video_9.mp4"));
        assert_eq!(partial, PathBuf::from("/store/Video_9.mp4.partial"));
    }

    #[test]
    fn test_transfer_error_names_stage() {
        let err = PlacerError::transfer(
            TransferStage::Publish,
            "/store/a.partial",
            "/store/a",
            std::io::Error::other("disk full"),
        );
        assert_eq!(
            err.to_string(),
            "publish failed moving /store/a.partial to /store/a"
        );
    }
}
