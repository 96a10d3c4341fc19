//! Error types for photo retrieval.
//!
//! None of these escape [`PhotoFetcher::fetch`](super::PhotoFetcher::fetch);
//! they exist so every failure cause can be logged and asserted on.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error used where the underlying cause comes from a pluggable backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Transport-level failure of a single HTTP round trip
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(#[source] BoxError),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(Box::new(e))
        }
    }
}

/// Failure while resolving a platform file reference
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no platform resolver configured")]
    Unconfigured,

    #[error("platform API rejected file {file_id}: {description}")]
    Rejected { file_id: String, description: String },

    #[error("platform request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("platform returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("platform file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("malformed platform response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single fetch produced no photo
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("empty source")]
    EmptySource,

    #[error("failed to prepare photo directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] BoxError),

    #[error("platform download failed for {file_id}: {source}")]
    Resolve {
        file_id: String,
        #[source]
        source: ResolveError,
    },

    #[error("timeout downloading {url}")]
    Timeout { url: String },

    #[error("error downloading {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("download failed {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid content type: {content_type:?}")]
    ContentType { url: String, content_type: String },

    #[error("photo too large: {size} bytes (limit {limit})")]
    TooLarge { url: String, size: u64, limit: u64 },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Build from a transport failure on `url`
    pub fn transport(url: &str, e: TransportError) -> Self {
        match e {
            TransportError::Timeout => FetchError::Timeout {
                url: url.to_string(),
            },
            TransportError::Request(source) => FetchError::Transport {
                url: url.to_string(),
                source,
            },
        }
    }

    /// Whether another HTTP attempt may succeed.
    ///
    /// Content defects (wrong media type, oversize) are permanent. Write
    /// failures count as unexpected errors and are retried like transport
    /// errors.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout { .. }
                | FetchError::Transport { .. }
                | FetchError::HttpStatus { .. }
                | FetchError::Write { .. }
        )
    }
}
