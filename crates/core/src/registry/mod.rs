//! Link registry: the ordered list of source URLs and their annotations.
//!
//! The registry is a plain text file with one URL per line. A line may carry
//! a trailing annotation after `" - "` (for example
//! `https://example.com/reel/1 - LARGE FILE`), and lines starting with `#`
//! are comments. Annotated records are permanently excluded from processing.
//!
//! The same format is used for the master registry and for the per-batch
//! working set.

mod error;
mod link_registry;
mod types;

pub use error::RegistryError;
pub use link_registry::LinkRegistry;
pub use types::{parse_line, Annotation, LinkRecord, ANNOTATION_SEPARATOR};
