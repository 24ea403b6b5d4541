//! Error types for content fetchers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single fetch attempt. All of them are retryable.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The URL could not be requested at all.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failure.
    #[error("Request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Writing the download failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external downloader could not be started.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external downloader exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The attempt did not finish in time.
    #[error("Fetching {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The fetcher gave up for its own reasons.
    #[error("Fetch rejected: {0}")]
    Rejected(String),
}

impl FetchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Request { .. } => "request",
            Self::Status { .. } => "status",
            Self::Io { .. } => "io",
            Self::Spawn { .. } => "spawn",
            Self::CommandFailed { .. } => "command",
            Self::Timeout { .. } => "timeout",
            Self::Rejected(_) => "rejected",
        }
    }
}
