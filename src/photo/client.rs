//! HTTP client seam and client lifecycle.
//!
//! A fetch either borrows a caller's client (never closed here) or owns one
//! built for the single call. Owned clients live inside a [`ClientLease`],
//! which closes them when dropped, so every exit path of a fetch releases
//! the client without per-branch cleanup.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use super::error::{BoxError, TransportError};

/// Maximum redirects followed by owned clients
const MAX_REDIRECTS: usize = 10;

/// Response of a single GET round trip
#[derive(Debug, Clone)]
pub struct PhotoResponse {
    pub status: u16,
    /// Raw `Content-Type` header, if present and valid UTF-8
    pub content_type: Option<String>,
    pub body: PhotoBody,
}

/// Response body, read no further than the caller's byte limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoBody {
    Complete(Bytes),
    /// Reading stopped once the body was known to exceed the limit.
    ///
    /// `size` is the declared `Content-Length`, or the bytes received when
    /// the limit was crossed.
    Oversize { size: u64 },
}

impl PhotoBody {
    /// Body of `bytes`, or `Oversize` if it exceeds `max_bytes`
    pub fn capped(bytes: Bytes, max_bytes: u64) -> Self {
        let size = bytes.len() as u64;
        if size > max_bytes {
            PhotoBody::Oversize { size }
        } else {
            PhotoBody::Complete(bytes)
        }
    }
}

/// Minimal HTTP capability needed to download a photo
#[async_trait]
pub trait PhotoClient: Send + Sync {
    /// Issue a GET and read at most `max_bytes` of a 200 response body
    async fn get(&self, url: &str, max_bytes: u64) -> Result<PhotoResponse, TransportError>;

    /// Release connections held by this client.
    ///
    /// Only called on clients the fetcher created itself.
    fn close(&self) {}
}

/// Creates the client a fetch owns when the caller supplies none
pub trait ClientFactory: Send + Sync {
    fn build(&self, timeout: Duration) -> Result<Box<dyn PhotoClient>, BoxError>;
}

#[async_trait]
impl PhotoClient for reqwest::Client {
    async fn get(&self, url: &str, max_bytes: u64) -> Result<PhotoResponse, TransportError> {
        let response = reqwest::Client::get(self, url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        // Error bodies are never used
        let body = if status == 200 {
            read_capped(response, max_bytes).await?
        } else {
            PhotoBody::Complete(Bytes::new())
        };

        Ok(PhotoResponse {
            status,
            content_type,
            body,
        })
    }

    fn close(&self) {
        // Dropping the last handle tears down the connection pool
        tracing::debug!("Closing owned HTTP client");
    }
}

/// Read a response body chunk by chunk, stopping as soon as it passes `max_bytes`
pub(crate) async fn read_capped(
    mut response: reqwest::Response,
    max_bytes: u64,
) -> Result<PhotoBody, reqwest::Error> {
    let declared = response.content_length();
    if let Some(size) = declared.filter(|&size| size > max_bytes) {
        return Ok(PhotoBody::Oversize { size });
    }

    let mut buf = BytesMut::with_capacity(declared.unwrap_or(0).min(max_bytes) as usize);
    while let Some(chunk) = response.chunk().await? {
        let size = (buf.len() + chunk.len()) as u64;
        if size > max_bytes {
            return Ok(PhotoBody::Oversize { size });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(PhotoBody::Complete(buf.freeze()))
}

/// Builds reqwest clients with a fixed connect/request timeout and redirect following
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestClientFactory;

impl ReqwestClientFactory {
    /// Build the concrete reqwest client, for callers that want to share one
    pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
    }
}

impl ClientFactory for ReqwestClientFactory {
    fn build(&self, timeout: Duration) -> Result<Box<dyn PhotoClient>, BoxError> {
        let client = Self::build_client(timeout)?;
        Ok(Box::new(client))
    }
}

/// The client used by one fetch, borrowed or owned
pub enum ClientLease<'a> {
    Borrowed(&'a dyn PhotoClient),
    Owned(Box<dyn PhotoClient>),
}

impl<'a> ClientLease<'a> {
    /// Borrow `client` if given, otherwise build one through `factory`
    pub fn acquire(
        client: Option<&'a dyn PhotoClient>,
        factory: &dyn ClientFactory,
        timeout: Duration,
    ) -> Result<Self, BoxError> {
        match client {
            Some(client) => Ok(ClientLease::Borrowed(client)),
            None => Ok(ClientLease::Owned(factory.build(timeout)?)),
        }
    }

    pub fn client(&self) -> &dyn PhotoClient {
        match self {
            ClientLease::Borrowed(client) => *client,
            ClientLease::Owned(client) => client.as_ref(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ClientLease::Owned(_))
    }
}

impl Drop for ClientLease<'_> {
    fn drop(&mut self) {
        if let ClientLease::Owned(client) = self {
            client.close();
        }
    }
}
