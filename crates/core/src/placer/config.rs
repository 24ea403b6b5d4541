use serde::{Deserialize, Serialize};

/// Tuning for [`FsPlacer`](super::FsPlacer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacerConfig {
    /// Buffer used when a commit has to copy across filesystems (default: 8 MiB)
    #[serde(default = "default_copy_buffer")]
    pub copy_buffer_bytes: usize,

    /// Try rename(2) before falling back to a copy (default: true)
    #[serde(default = "default_true")]
    pub rename_first: bool,

    /// fsync the `.partial` copy before publishing it (default: true)
    #[serde(default = "default_true")]
    pub sync_copies: bool,
}

fn default_copy_buffer() -> usize {
    8 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            copy_buffer_bytes: default_copy_buffer(),
            rename_first: true,
            sync_copies: true,
        }
    }
}

impl PlacerConfig {
    /// Always copy, as if the holding directory sat on another device.
    pub fn copy_only(mut self) -> Self {
        self.rename_first = false;
        self
    }

    pub fn with_copy_buffer(mut self, bytes: usize) -> Self {
        self.copy_buffer_bytes = bytes.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlacerConfig::default();
        assert_eq!(config.copy_buffer_bytes, 8 * 1024 * 1024);
        assert!(config.rename_first);
        assert!(config.sync_copies);
    }

    #[test]
    fn test_copy_only_with_small_buffer() {
        let config = PlacerConfig::default().copy_only().with_copy_buffer(0);
        assert!(!config.rename_first);
        assert_eq!(config.copy_buffer_bytes, 1);
    }
}
