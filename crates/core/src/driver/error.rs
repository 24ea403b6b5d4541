//! Error types for the driver module.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::store::StoreError;
use crate::triage::TriageError;

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Triage(#[from] TriageError),
}

impl DriverError {
    /// Whether persisted data is damaged rather than temporarily unavailable.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Registry(e) => e.is_corruption(),
            Self::Store(e) => e.is_corruption(),
            Self::Triage(TriageError::Registry(e)) => e.is_corruption(),
            Self::Triage(_) => false,
        }
    }
}
