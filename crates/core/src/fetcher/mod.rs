//! Content fetcher abstraction and implementations.
//!
//! A `ContentFetcher` is asked to produce one media file for a URL inside a
//! destination directory. Its success report is advisory: callers confirm the
//! outcome with an `ArtifactLocator` scanning that directory.

mod command;
mod error;
mod http;
mod locator;
mod traits;

pub use command::CommandFetcher;
pub use error::FetchError;
pub use http::HttpFetcher;
pub use locator::{ArtifactLocator, MediaFileLocator};
pub use traits::ContentFetcher;
