//! IPFS HTTP API client configuration.
//!
//! Defaults point at a local kubo daemon. Override via environment variables
//! or explicit construction.

use serde::{Deserialize, Serialize};
use url::Url;

/// Default API address of a local kubo daemon.
pub const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`IpfsHttpStore`](crate::IpfsHttpStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpfsConfig {
    /// Base URL of the HTTP API, without the `/api/v0` suffix.
    pub api_url: Url,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Variable overriding `api_url`.
pub const API_URL_VAR: &str = "TALLY_IPFS_API_URL";

/// Variable overriding `timeout_secs`.
pub const TIMEOUT_VAR: &str = "TALLY_IPFS_TIMEOUT_SECS";

impl IpfsConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `TALLY_IPFS_API_URL` (default: `http://127.0.0.1:5001`)
    /// - `TALLY_IPFS_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults, overridden by `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::local_daemon()?;
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// The local kubo daemon with the default timeout.
    pub fn local_daemon() -> Result<Self, ConfigError> {
        let api_url = Url::parse(DEFAULT_IPFS_API_URL)
            .map_err(|e| ConfigError::InvalidUrl(DEFAULT_IPFS_API_URL.to_string(), e.to_string()))?;
        Ok(Self::with_url(api_url))
    }

    /// Replace fields whose variable `lookup` returns. Malformed values are
    /// errors, never ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(API_URL_VAR) {
            self.api_url = Url::parse(raw.trim())
                .map_err(|e| ConfigError::InvalidUrl(API_URL_VAR.to_string(), e.to_string()))?;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            self.timeout_secs = raw.trim().parse().map_err(|e| {
                ConfigError::InvalidValue(TIMEOUT_VAR.to_string(), format!("{raw:?}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Configuration for `api_url` with the default timeout.
    pub fn with_url(api_url: Url) -> Self {
        Self {
            api_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Configuration pointing at a local mock server (for testing).
    pub fn local(url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: Url::parse(url)
                .map_err(|e| ConfigError::InvalidUrl(url.to_string(), e.to_string()))?,
            timeout_secs: 5,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
