//! Durable single-document stores.
//!
//! Every piece of persistent state (link registry, working set, batch cursor,
//! sequence counter) is a small UTF-8 document that is read whole and
//! rewritten whole. This module provides the `TextStore` trait for that
//! pattern, a file-backed implementation that rewrites atomically, and an
//! in-memory implementation for tests.

mod error;
mod file;
mod integer;
mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use integer::PersistedInteger;
pub use memory::MemoryStore;

/// A whole-document store.
///
/// Implementations must make `write` all-or-nothing: a reader never observes
/// a partially written document.
pub trait TextStore: Send + Sync {
    /// Human readable location, used in logs and errors.
    fn location(&self) -> String;

    /// Reads the whole document. `Ok(None)` means the document does not exist yet.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the whole document.
    fn write(&self, contents: &str) -> Result<(), StoreError>;
}
