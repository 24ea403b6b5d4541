//! Placer module for committing artifacts to the final store.
//!
//! This module provides the `Placer` trait and a filesystem implementation
//! that moves one file to its destination without ever exposing a partially
//! written file under the destination name.
//!
//! # Features
//!
//! - Atomic rename when source and destination share a filesystem
//! - Cross-device fallback: copy into a sibling `.partial` file, fsync, rename
//! - Never overwrites an existing destination
//! - Automatic parent directory creation
//!
//! # Example
//!
//! ```ignore
//! use reelbatch_core::placer::{FsPlacer, Placer};
//!
//! let placer = FsPlacer::with_defaults();
//! let placed = placer
//!     .place(Path::new("temp/Video_7.mp4"), Path::new("VIDEOS/Video_7.mp4"))
//!     .await?;
//! println!("Placed {} bytes", placed.size_bytes);
//! ```

mod config;
mod error;
mod fs_placer;
mod traits;

pub use config::PlacerConfig;
pub use error::{PlacerError, TransferStage};
pub use fs_placer::FsPlacer;
pub use traits::{PlacedFile, Placer};
