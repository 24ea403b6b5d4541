//! Bulk extraction of media from `.zip` archives into the final store.

mod error;
mod extract;

pub use error::ArchiveError;
pub use extract::{extract_archives, ExtractionReport};
