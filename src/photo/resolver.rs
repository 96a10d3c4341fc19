//! Platform file references.
//!
//! A [`FileResolver`] turns an opaque platform file id into bytes on disk.
//! [`TelegramFileResolver`] talks to the Telegram Bot API directly over
//! reqwest: `getFile` yields a server-side path, which is then downloaded
//! from the file endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::client::{PhotoBody, ReqwestClientFactory, read_capped};
use super::error::{ResolveError, TransportError};

/// Default Telegram Bot API endpoint
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Largest file the Bot API serves for download
pub const DEFAULT_TELEGRAM_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Resolves a platform file id and writes its bytes to `dest`
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn download_to(&self, file_id: &str, dest: &Path) -> Result<(), ResolveError>;
}

/// Resolver for deployments without platform access; always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlatformResolver;

#[async_trait]
impl FileResolver for NoPlatformResolver {
    async fn download_to(&self, _file_id: &str, _dest: &Path) -> Result<(), ResolveError> {
        Err(ResolveError::Unconfigured)
    }
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_path: Option<String>,
}

/// Telegram Bot API file resolver
#[derive(Clone)]
pub struct TelegramFileResolver {
    client: reqwest::Client,
    token: String,
    api_base: String,
    max_bytes: u64,
}

impl std::fmt::Debug for TelegramFileResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramFileResolver")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl TelegramFileResolver {
    /// Create a resolver with its own client
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = ReqwestClientFactory::build_client(timeout)?;
        Ok(Self::with_client(client, token, api_base))
    }

    /// Create a resolver sharing an existing client
    pub fn with_client(
        client: reqwest::Client,
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_bytes: DEFAULT_TELEGRAM_MAX_BYTES,
        }
    }

    /// Refuse files larger than `max_bytes`
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Look up the server-side path of `file_id`
    async fn file_path(&self, file_id: &str) -> Result<String, ResolveError> {
        let url = format!("{}/bot{}/getFile", self.api_base, self.token);
        let response = self
            .client
            .get(&url)
            .query(&[("file_id", file_id)])
            .send()
            .await
            .map_err(redact)?;

        let status = response.status();
        let body = response.bytes().await.map_err(redact)?;

        // The API answers errors with a JSON envelope too, so try that first
        let envelope: ApiResponse<TelegramFile> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ResolveError::HttpStatus {
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(ResolveError::Malformed(e)),
        };

        if !envelope.ok {
            return Err(ResolveError::Rejected {
                file_id: file_id.to_string(),
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            });
        }

        envelope
            .result
            .and_then(|file| file.file_path)
            .ok_or_else(|| ResolveError::Rejected {
                file_id: file_id.to_string(),
                description: "file has no downloadable path".to_string(),
            })
    }
}

#[async_trait]
impl FileResolver for TelegramFileResolver {
    async fn download_to(&self, file_id: &str, dest: &Path) -> Result<(), ResolveError> {
        let file_path = self.file_path(file_id).await?;
        tracing::debug!("Resolved Telegram file {} to {}", file_id, file_path);

        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, file_path);
        let response = self.client.get(&url).send().await.map_err(redact)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let bytes = match read_capped(response, self.max_bytes).await.map_err(redact)? {
            PhotoBody::Complete(bytes) => bytes,
            PhotoBody::Oversize { size } => {
                return Err(ResolveError::TooLarge {
                    size,
                    limit: self.max_bytes,
                });
            }
        };
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| ResolveError::Io {
                path: PathBuf::from(dest),
                source,
            })?;

        Ok(())
    }
}

/// Strip the URL (which embeds the bot token) from reqwest errors
fn redact(e: reqwest::Error) -> TransportError {
    TransportError::from(e.without_url())
}
