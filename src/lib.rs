//! Photo fetcher
//!
//! Downloads a single photo from a Telegram file reference (`tg:<file_id>`)
//! or an HTTP/HTTPS URL into local temp storage:
//! - Validates content type and a configurable size ceiling
//! - Retries transient network failures a bounded number of times
//! - Borrows a caller's HTTP client or owns and closes one per call
//!
//! Failures never surface as errors from [`PhotoFetcher::fetch`]; callers
//! get [`FetchOutcome::NotFound`] and operators get the cause in the logs.

pub mod config;
pub mod photo;

pub use config::{Config, ConfigError};
pub use photo::{FetchConfig, FetchError, FetchOutcome, FileResolver, PhotoClient, PhotoFetcher};
