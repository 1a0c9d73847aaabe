//! Runtime configuration parsed from environment variables.
//!
//! Every value has a default so a bare `polymark session --url ...` works
//! against a local development endpoint. The CLI starts from `from_env` and
//! then applies its `--base-url`, `--map-id`, `--storage-dir` and
//! `--sync-delay-ms` flags on top.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_MAP_ID: &str = "polygons";
pub const DEFAULT_STORAGE_DIR: &str = ".polymark";
pub const DEFAULT_SYNC_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("map id must not be empty")]
    EmptyMapId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for RemoteTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Where and how to reach the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub map_id: String,
    pub timeouts: RemoteTimeouts,
}

impl RemoteConfig {
    /// Validate and normalize: trailing slashes are dropped from the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparseable or non-http(s) base URL, or an
    /// empty map id.
    pub fn new(base_url: &str, map_id: &str, timeouts: RemoteTimeouts) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }
        let map_id = map_id.trim();
        if map_id.is_empty() {
            return Err(ConfigError::EmptyMapId);
        }
        Ok(Self { base_url: trimmed.to_owned(), map_id: map_id.to_owned(), timeouts })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.connect_secs)
    }
}

/// Full session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub remote: RemoteConfig,
    pub storage_dir: PathBuf,
    pub sync_delay: Duration,
}

impl Config {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `POLYMARK_BASE_URL`: remote endpoint root (default `http://127.0.0.1:3000`)
    /// - `POLYMARK_MAP_ID`: map namespace in the endpoint path (default `polygons`)
    /// - `POLYMARK_STORAGE_DIR`: local storage directory (default `.polymark`)
    /// - `POLYMARK_SYNC_DELAY_MS`: auto-sync debounce (default 1000)
    /// - `POLYMARK_REQUEST_TIMEOUT_SECS`: default 30
    /// - `POLYMARK_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or map id is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("POLYMARK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let map_id = std::env::var("POLYMARK_MAP_ID").unwrap_or_else(|_| DEFAULT_MAP_ID.to_owned());
        let timeouts = RemoteTimeouts {
            request_secs: env_parse("POLYMARK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("POLYMARK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let storage_dir = std::env::var("POLYMARK_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR));

        Ok(Self {
            remote: RemoteConfig::new(&base_url, &map_id, timeouts)?,
            storage_dir,
            sync_delay: Duration::from_millis(env_parse("POLYMARK_SYNC_DELAY_MS", DEFAULT_SYNC_DELAY_MS)),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
