//! A single persisted decimal integer.

use std::sync::Arc;

use super::{StoreError, TextStore};

/// One non-negative integer stored as decimal text.
///
/// Used for the batch cursor, the drain marker and the sequence counter.
/// Malformed content is reported as corruption rather than reset, so a
/// damaged counter can never hand out an id twice.
#[derive(Clone)]
pub struct PersistedInteger {
    store: Arc<dyn TextStore>,
}

impl PersistedInteger {
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self { store }
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Reads the value, `None` when the document is absent.
    pub fn get(&self) -> Result<Option<u64>, StoreError> {
        let Some(raw) = self.store.read()? else {
            return Ok(None);
        };

        let trimmed = raw.trim();
        trimmed
            .parse::<u64>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt {
                location: self.store.location(),
                reason: format!("expected a decimal integer, found {:?}", trimmed),
            })
    }

    /// Reads the value, persisting `initial` first if the document is absent.
    pub fn get_or_init(&self, initial: u64) -> Result<u64, StoreError> {
        match self.get()? {
            Some(value) => Ok(value),
            None => {
                self.set(initial)?;
                Ok(initial)
            }
        }
    }

    pub fn set(&self, value: u64) -> Result<(), StoreError> {
        self.store.write(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_get_or_init_persists_initial() {
        let mem = MemoryStore::new("n");
        let int = PersistedInteger::new(Arc::new(mem.clone()));
        assert_eq!(int.get_or_init(1).unwrap(), 1);
        assert_eq!(mem.snapshot().as_deref(), Some("1"));
    }

    #[test]
    fn test_tolerates_surrounding_whitespace() {
        let int = PersistedInteger::new(Arc::new(MemoryStore::with_contents("n", " 42\r\n")));
        assert_eq!(int.get().unwrap(), Some(42));
    }

    #[test]
    fn test_garbage_is_corruption() {
        let int = PersistedInteger::new(Arc::new(MemoryStore::with_contents("n", "forty")));
        let err = int.get_or_init(1).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_empty_document_is_corruption() {
        let int = PersistedInteger::new(Arc::new(MemoryStore::with_contents("n", "")));
        assert!(int.get().unwrap_err().is_corruption());
    }
}
