//! In-memory store for tests and dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{StoreError, TextStore};

/// A `TextStore` held in memory.
///
/// Clones share the same document, so a test can keep a handle while the
/// code under test owns another. `fail_next_writes` simulates a process dying
/// before a write lands.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    contents: Arc<Mutex<Option<String>>>,
    failing_writes: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Creates an empty (absent) document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a document with initial contents.
    pub fn with_contents(name: impl Into<String>, contents: impl Into<String>) -> Self {
        let store = Self::new(name);
        *store.lock() = Some(contents.into());
        store
    }

    /// Current contents without going through the trait.
    pub fn snapshot(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Makes the next `n` writes fail without changing the document.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // Poisoning is ignored: the guarded value is replaced, never mutated in place.
        self.contents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TextStore for MemoryStore {
    fn location(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock().clone())
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        let remaining = self.failing_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Simulated {
                location: self.location(),
            });
        }
        *self.lock() = Some(contents.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
