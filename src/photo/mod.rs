//! Photo acquisition.
//!
//! Classifies a source, downloads it through the platform resolver or over
//! HTTP with retries, and saves it under a unique name in the photo
//! directory.

pub mod client;
pub mod download;
pub mod error;
pub mod naming;
pub mod resolver;
pub mod source;

pub use client::{
    ClientFactory, ClientLease, PhotoBody, PhotoClient, PhotoResponse, ReqwestClientFactory,
};
pub use download::{FetchConfig, FetchOutcome, PhotoFetcher};
pub use error::{FetchError, ResolveError, TransportError};
pub use naming::{NameGenerator, generate_unique_filename};
pub use resolver::{FileResolver, NoPlatformResolver, TelegramFileResolver};
pub use source::{PLATFORM_PREFIX, PhotoSource};
