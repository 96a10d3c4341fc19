//! Configuration management for the photo fetcher.
//!
//! Handles loading and validating configuration from JSON files, with
//! environment variable overrides for deployment-specific values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::photo::FetchConfig;
use crate::photo::resolver::DEFAULT_TELEGRAM_API_BASE;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/photo-fetcher/config.json";

/// Overrides `photo_dir`
pub const ENV_TEMP_DIR: &str = "PHOTO_FETCHER_TEMP_DIR";
/// Overrides `max_photo_size_mb`
pub const ENV_MAX_PHOTO_SIZE_MB: &str = "PHOTO_FETCHER_MAX_PHOTO_SIZE_MB";
/// Overrides `telegram_bot_token`
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory downloaded photos are written to
    #[serde(default = "default_photo_dir")]
    pub photo_dir: PathBuf,

    /// Maximum accepted photo size in megabytes
    #[serde(default = "default_max_photo_size_mb")]
    pub max_photo_size_mb: u64,

    /// Connect/request timeout for HTTP downloads, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between HTTP attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Total HTTP attempts per photo
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Telegram bot token; `tg:` sources fail without it
    #[serde(default, skip_serializing)]
    pub telegram_bot_token: Option<String>,

    /// Telegram Bot API base URL
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
}

fn default_photo_dir() -> PathBuf {
    std::env::temp_dir().join("photo-fetcher")
}

fn default_max_photo_size_mb() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            photo_dir: default_photo_dir(),
            max_photo_size_mb: default_max_photo_size_mb(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
            telegram_bot_token: None,
            telegram_api_base: default_telegram_api_base(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_TEMP_DIR).filter(|v| !v.trim().is_empty()) {
            self.photo_dir = PathBuf::from(dir.trim());
        }

        if let Some(size) = lookup(ENV_MAX_PHOTO_SIZE_MB) {
            self.max_photo_size_mb = size.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{} must be a whole number of megabytes, got '{}'",
                    ENV_MAX_PHOTO_SIZE_MB, size
                ))
            })?;
        }

        if let Some(token) = lookup(ENV_TELEGRAM_BOT_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.telegram_bot_token = Some(token.trim().to_string());
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.photo_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "photo_dir cannot be empty".to_string(),
            ));
        }

        if self.max_photo_size_mb < 1 || self.max_photo_size_mb > 100 {
            return Err(ConfigError::ValidationError(
                "max_photo_size_mb must be between 1 and 100".to_string(),
            ));
        }

        if self.request_timeout_secs < 1 || self.request_timeout_secs > 300 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if self.max_attempts < 1 || self.max_attempts > 10 {
            return Err(ConfigError::ValidationError(
                "max_attempts must be between 1 and 10".to_string(),
            ));
        }

        if self.retry_delay_ms > 60_000 {
            return Err(ConfigError::ValidationError(
                "retry_delay_ms must be at most 60000".to_string(),
            ));
        }

        if !self.telegram_api_base.starts_with("http://")
            && !self.telegram_api_base.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "telegram_api_base '{}' must be an http(s) URL",
                self.telegram_api_base
            )));
        }

        Ok(())
    }

    /// Runtime settings for [`PhotoFetcher`](crate::photo::PhotoFetcher)
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            photo_dir: self.photo_dir.clone(),
            max_photo_size_mb: self.max_photo_size_mb,
            request_timeout: self.request_timeout(),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if a Telegram bot token is configured
    pub fn has_telegram_token(&self) -> bool {
        self.telegram_bot_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}
