//! Photo download functionality.
//!
//! Fetches a single photo from a platform file reference or an HTTP/HTTPS
//! URL into the configured photo directory, with retry logic for transient
//! network failures.
//!
//! Every failure is absorbed: [`PhotoFetcher::fetch`] reports only
//! [`FetchOutcome::Saved`] or [`FetchOutcome::NotFound`], and the cause is
//! logged. [`PhotoFetcher::try_fetch`] returns the cause for callers that
//! want it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::client::{ClientFactory, ClientLease, PhotoBody, PhotoClient, ReqwestClientFactory};
use super::error::{FetchError, ResolveError};
use super::naming::{NameGenerator, default_name_generator};
use super::resolver::FileResolver;
use super::source::PhotoSource;

/// Media type prefix a response must declare to be accepted
const IMAGE_MEDIA_PREFIX: &str = "image/";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Download configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory photos are saved into (created on demand)
    pub photo_dir: PathBuf,
    /// Maximum accepted photo size in megabytes
    pub max_photo_size_mb: u64,
    /// Connect and request timeout for owned clients
    pub request_timeout: Duration,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Total number of HTTP attempts (including the first)
    pub max_attempts: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            photo_dir: std::env::temp_dir().join("photo-fetcher"),
            max_photo_size_mb: 10,
            request_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(1),
            max_attempts: 3,
        }
    }
}

impl FetchConfig {
    /// Size ceiling in bytes, saturating at `u64::MAX`
    pub fn max_photo_bytes(&self) -> u64 {
        self.max_photo_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Result of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Photo fully written and validated at this path
    Saved(PathBuf),
    /// No photo; nothing was left on disk
    NotFound,
}

impl FetchOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            FetchOutcome::Saved(path) => Some(path),
            FetchOutcome::NotFound => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            FetchOutcome::Saved(path) => Some(path),
            FetchOutcome::NotFound => None,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, FetchOutcome::Saved(_))
    }
}

/// Downloads photos into local temp storage
///
/// Holds no per-fetch state, so one fetcher can serve concurrent fetches.
#[derive(Clone)]
pub struct PhotoFetcher {
    config: FetchConfig,
    names: NameGenerator,
    client_factory: Arc<dyn ClientFactory>,
}

impl PhotoFetcher {
    /// Create a fetcher with the default name generator and reqwest clients
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            names: default_name_generator(),
            client_factory: Arc::new(ReqwestClientFactory),
        }
    }

    /// Replace the unique filename generator
    pub fn with_name_generator(mut self, names: NameGenerator) -> Self {
        self.names = names;
        self
    }

    /// Replace how owned clients are built
    pub fn with_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = factory;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch a photo, collapsing every failure into [`FetchOutcome::NotFound`]
    ///
    /// `client` is borrowed and never closed. Without one, a client is built
    /// for this call and closed before returning.
    pub async fn fetch(
        &self,
        source: &str,
        resolver: &dyn FileResolver,
        client: Option<&dyn PhotoClient>,
    ) -> FetchOutcome {
        match self.try_fetch(source, resolver, client).await {
            Ok(path) => FetchOutcome::Saved(path),
            Err(e) => {
                tracing::debug!("No photo saved for {:?}: {}", source, e);
                FetchOutcome::NotFound
            }
        }
    }

    /// Fetch a photo, returning why it failed
    pub async fn try_fetch(
        &self,
        source: &str,
        resolver: &dyn FileResolver,
        client: Option<&dyn PhotoClient>,
    ) -> Result<PathBuf, FetchError> {
        let parsed = PhotoSource::parse(source).ok_or(FetchError::EmptySource)?;

        tokio::fs::create_dir_all(&self.config.photo_dir)
            .await
            .map_err(|source| FetchError::Directory {
                path: self.config.photo_dir.clone(),
                source,
            })?;

        // One name per fetch, reused by every retry
        let dest = self.config.photo_dir.join((self.names)());

        match parsed {
            PhotoSource::Platform { file_id } => {
                self.fetch_platform(file_id, &dest, resolver).await
            }
            PhotoSource::Url(url) => {
                let lease = ClientLease::acquire(
                    client,
                    self.client_factory.as_ref(),
                    self.config.request_timeout,
                )
                .map_err(FetchError::Client)?;

                self.fetch_url(url, &dest, lease.client()).await
            }
        }
    }

    /// Platform references go straight through the resolver, without retries
    async fn fetch_platform(
        &self,
        file_id: &str,
        dest: &Path,
        resolver: &dyn FileResolver,
    ) -> Result<PathBuf, FetchError> {
        let resolved = match resolver.download_to(file_id, dest).await {
            Ok(()) => tokio::fs::metadata(dest)
                .await
                .map_err(|source| ResolveError::Io {
                    path: dest.to_path_buf(),
                    source,
                }),
            Err(e) => Err(e),
        };

        match resolved {
            Ok(meta) => {
                tracing::info!("Photo saved (TG): {} ({} bytes)", file_name(dest), meta.len());
                Ok(dest.to_path_buf())
            }
            Err(source) => {
                tracing::error!("Telegram download failed for {}: {}", file_id, source);
                remove_partial(dest).await;
                Err(FetchError::Resolve {
                    file_id: file_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Download with retry logic
    async fn fetch_url(
        &self,
        url: &str,
        dest: &Path,
        client: &dyn PhotoClient,
    ) -> Result<PathBuf, FetchError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::debug!(
                    "Retry attempt {}/{}, waiting {:?}",
                    attempt + 1,
                    attempts,
                    self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }

            match self.attempt(url, dest, client).await {
                Ok(size) => {
                    tracing::info!("Photo saved (HTTP): {} ({} bytes)", file_name(dest), size);
                    return Ok(dest.to_path_buf());
                }
                Err(e) => {
                    log_failure(&e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::Timeout {
            url: url.to_string(),
        }))
    }

    /// One GET, validated and written on success
    async fn attempt(
        &self,
        url: &str,
        dest: &Path,
        client: &dyn PhotoClient,
    ) -> Result<usize, FetchError> {
        let limit = self.config.max_photo_bytes();
        let response = client
            .get(url, limit)
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        if response.status != 200 {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let content_type = response.content_type.unwrap_or_default();
        if !content_type
            .to_ascii_lowercase()
            .starts_with(IMAGE_MEDIA_PREFIX)
        {
            return Err(FetchError::ContentType {
                url: url.to_string(),
                content_type,
            });
        }

        // Clients may return the full body even when it exceeds the limit
        let body = match response.body {
            PhotoBody::Complete(body) if body.len() as u64 <= limit => body,
            PhotoBody::Complete(body) => {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    size: body.len() as u64,
                    limit,
                });
            }
            PhotoBody::Oversize { size } => {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    size,
                    limit,
                });
            }
        };

        let size = body.len();
        write_photo(dest, body).await?;
        Ok(size)
    }
}

fn log_failure(e: &FetchError) {
    match e {
        FetchError::HttpStatus { url, status } => {
            tracing::warn!("Download failed {}: {}", url, status)
        }
        FetchError::Timeout { url } => tracing::warn!("Timeout downloading {}", url),
        FetchError::ContentType { content_type, .. } => {
            tracing::error!("Invalid content type: {:?}", content_type)
        }
        FetchError::TooLarge { size, limit, .. } => {
            tracing::error!("Photo too large: {} bytes (limit {})", size, limit)
        }
        other => tracing::error!("{}", other),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sibling path the body is written to before the final rename
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Write the body off the async scheduler
async fn write_photo(dest: &Path, body: Bytes) -> Result<(), FetchError> {
    let target = dest.to_path_buf();
    let result = tokio::task::spawn_blocking(move || write_atomic(&target, &body))
        .await
        .map_err(std::io::Error::other)
        .and_then(|r| r);

    result.map_err(|source| FetchError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

/// Write-to-temp-then-rename, so `dest` only ever holds a complete photo
fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = partial_path(dest);

    let written = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, dest));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written
}

async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => tracing::debug!("Removed partial file {}", dest.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial file {}: {}", dest.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_policy() {
        let config = FetchConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_photo_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn huge_size_limit_saturates() {
        let config = FetchConfig {
            max_photo_size_mb: u64::MAX,
            ..FetchConfig::default()
        };
        assert_eq!(config.max_photo_bytes(), u64::MAX);
    }

    #[test]
    fn partial_path_appends_suffix() {
        let path = partial_path(Path::new("/tmp/photos/photo_1.jpg"));
        assert_eq!(path, PathBuf::from("/tmp/photos/photo_1.jpg.part"));
    }

    #[test]
    fn atomic_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");

        write_atomic(&dest, b"jpeg bytes").unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg bytes");
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn failed_write_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing").join("photo.jpg");

        assert!(write_atomic(&dest, b"jpeg bytes").is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn outcome_accessors() {
        let saved = FetchOutcome::Saved(PathBuf::from("/tmp/a.jpg"));
        assert!(saved.is_saved());
        assert_eq!(saved.path(), Some(Path::new("/tmp/a.jpg")));
        assert_eq!(FetchOutcome::NotFound.into_path(), None);
    }
}
