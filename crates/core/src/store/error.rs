//! Error types for the store module.

use thiserror::Error;

/// Errors raised by durable stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed (disk full, permission denied, ...).
    #[error("I/O error on {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid UTF-8.
    #[error("{location} is not valid UTF-8")]
    InvalidUtf8 { location: String },

    /// The document exists but does not have the expected shape.
    #[error("{location} is corrupt: {reason}")]
    Corrupt { location: String, reason: String },

    /// Injected failure (in-memory store only).
    #[error("simulated write failure on {location}")]
    Simulated { location: String },
}

impl StoreError {
    /// Creates an I/O error for the given location.
    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    /// Whether this error means the stored data itself is unusable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::InvalidUtf8 { .. } | Self::Corrupt { .. })
    }
}
