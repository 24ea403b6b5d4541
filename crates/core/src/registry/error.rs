//! Error types for the registry module.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while reading or rewriting a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry has content this program does not understand.
    #[error("registry {location} is corrupt at line {line}: {reason}")]
    Corruption {
        location: String,
        line: usize,
        reason: String,
    },

    /// The registry document does not exist.
    #[error("registry not found: {location}")]
    Missing { location: String },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    /// Whether the registry content itself is damaged (as opposed to I/O trouble).
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Corruption { .. } => true,
            Self::Store(e) => e.is_corruption(),
            Self::Missing { .. } => false,
        }
    }
}
