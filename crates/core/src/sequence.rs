//! Persistent sequence counter for artifact names.

use std::sync::Arc;

use tracing::debug;

use crate::store::{PersistedInteger, StoreError, TextStore};

/// Monotonic id source backed by a single persisted integer.
///
/// The stored value is always the next id to hand out. `next` persists the
/// increment before returning, so a crash can skip an id but never reuse one.
#[derive(Clone)]
pub struct SequenceCounter {
    value: PersistedInteger,
}

impl SequenceCounter {
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self {
            value: PersistedInteger::new(store),
        }
    }

    pub fn location(&self) -> String {
        self.value.location()
    }

    /// The next id that `next` would return, initialising the store to 1.
    pub fn current(&self) -> Result<u64, StoreError> {
        let current = self.value.get_or_init(1)?;
        if current == 0 {
            return Err(StoreError::Corrupt {
                location: self.location(),
                reason: "counter values start at 1".to_string(),
            });
        }
        Ok(current)
    }

    /// Reserves an id.
    pub fn next(&self) -> Result<u64, StoreError> {
        let id = self.current()?;
        let following = id.checked_add(1).ok_or_else(|| StoreError::Corrupt {
            location: self.location(),
            reason: "counter overflow".to_string(),
        })?;
        self.value.set(following)?;
        debug!(id, counter = %self.location(), "sequence id reserved");
        Ok(id)
    }
}
