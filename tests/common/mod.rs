//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use photo_fetcher::photo::error::BoxError;
use photo_fetcher::photo::{
    ClientFactory, FetchConfig, FileResolver, PhotoBody, PhotoClient, PhotoResponse,
    ResolveError, TransportError,
};
use tokio::time::Instant;

pub fn test_config(dir: &Path) -> FetchConfig {
    FetchConfig {
        photo_dir: dir.join("photos"),
        max_photo_size_mb: 10,
        request_timeout: Duration::from_millis(500),
        retry_delay: Duration::from_millis(50),
        max_attempts: 3,
    }
}

/// Files currently in `dir` (empty if it does not exist)
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn image(status: u16, body: &[u8]) -> Result<PhotoResponse, TransportError> {
    Ok(PhotoResponse {
        status,
        content_type: Some("image/jpeg".to_string()),
        body: PhotoBody::Complete(Bytes::copy_from_slice(body)),
    })
}

pub fn html() -> Result<PhotoResponse, TransportError> {
    Ok(PhotoResponse {
        status: 200,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: PhotoBody::Complete(Bytes::from_static(b"<html></html>")),
    })
}

/// Client replaying a fixed script of responses; repeats the last one.
///
/// Honours the byte limit like the reqwest client does, unless built with
/// [`ScriptedClient::ignoring_limit`].
#[derive(Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<VecDeque<Result<PhotoResponse, TransportError>>>>,
    pub calls: Arc<Mutex<Vec<Instant>>>,
    /// Byte limit passed on each call
    pub limits: Arc<Mutex<Vec<u64>>>,
    pub closed: Arc<AtomicUsize>,
    ignore_limit: bool,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<PhotoResponse, TransportError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    /// Always return the whole scripted body
    pub fn ignoring_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

fn replay(entry: &Result<PhotoResponse, TransportError>) -> Result<PhotoResponse, TransportError> {
    match entry {
        Ok(response) => Ok(response.clone()),
        Err(TransportError::Timeout) => Err(TransportError::Timeout),
        Err(TransportError::Request(e)) => Err(TransportError::Request(e.to_string().into())),
    }
}

#[async_trait]
impl PhotoClient for ScriptedClient {
    async fn get(&self, _url: &str, max_bytes: u64) -> Result<PhotoResponse, TransportError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.limits.lock().unwrap().push(max_bytes);
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                replay(script.front().expect("script must not be empty"))
            }
        };

        if self.ignore_limit {
            return next;
        }
        next.map(|mut response| {
            if let PhotoBody::Complete(body) = response.body {
                response.body = PhotoBody::capped(body, max_bytes);
            }
            response
        })
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out clones of one scripted client and counts builds
#[derive(Clone)]
pub struct ScriptedFactory {
    pub client: ScriptedClient,
    pub built: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new(client: ScriptedClient) -> Self {
        Self {
            client,
            built: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn build_count(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

impl ClientFactory for ScriptedFactory {
    fn build(&self, _timeout: Duration) -> Result<Box<dyn PhotoClient>, BoxError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.client.clone()))
    }
}

/// Resolver writing fixed bytes, or failing after a partial write
pub struct FakeResolver {
    pub bytes: Option<Vec<u8>>,
    pub partial_then_fail: bool,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn ok(bytes: &[u8]) -> Self {
        Self {
            bytes: Some(bytes.to_vec()),
            partial_then_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            bytes: Some(b"partial".to_vec()),
            partial_then_fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reports success without writing anything
    pub fn silent() -> Self {
        Self {
            bytes: None,
            partial_then_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileResolver for FakeResolver {
    async fn download_to(&self, file_id: &str, dest: &Path) -> Result<(), ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(bytes) = &self.bytes {
            std::fs::write(dest, bytes).map_err(|source| ResolveError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
        }

        if self.partial_then_fail {
            return Err(ResolveError::Rejected {
                file_id: file_id.to_string(),
                description: "connection reset mid-download".to_string(),
            });
        }
        Ok(())
    }
}
