//! Engine and client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ErrorCode;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_FRAME_DELAY_MS: u64 = 45;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 500;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A base URL is not an `http(s)://` or `ws(s)://` URL.
    #[error("invalid base URL for {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "E_CONFIG_URL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// REST base, no trailing slash.
    pub api_base_url: String,
    /// Websocket base, no trailing slash.
    pub ws_base_url: String,
    /// Snapshot polling cadence used as the push-channel fallback.
    pub poll_interval: Duration,
    /// Pause between word-cloud animation frames.
    pub frame_delay: Duration,
    pub request_timeout: Duration,
    /// First reconnect delay; doubled per failure with jitter.
    pub reconnect_base: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_base_url: "ws://localhost:8000".to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            frame_delay: Duration::from_millis(DEFAULT_FRAME_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect_base: Duration::from_millis(DEFAULT_RECONNECT_BASE_MS),
        }
    }
}

impl EngineConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `LIVEDECK_API_BASE_URL`: default `http://localhost:8000`
    /// - `LIVEDECK_WS_BASE_URL`: derived from the API URL when absent
    /// - `LIVEDECK_POLL_INTERVAL_MS`: default 5000
    /// - `LIVEDECK_FRAME_DELAY_MS`: default 45
    /// - `LIVEDECK_REQUEST_TIMEOUT_SECS`: default 20
    /// - `LIVEDECK_RECONNECT_BASE_MS`: default 500
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrl`] when a base URL has an unknown scheme.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injected variable source.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrl`] when a base URL has an unknown scheme.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("LIVEDECK_API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = api_base_url.trim_end_matches('/').to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl { var: "LIVEDECK_API_BASE_URL", value: api_base_url });
        }

        let ws_base_url = match lookup("LIVEDECK_WS_BASE_URL").map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(url) if url.starts_with("ws://") || url.starts_with("wss://") => url.trim_end_matches('/').to_string(),
            Some(url) => return Err(ConfigError::InvalidUrl { var: "LIVEDECK_WS_BASE_URL", value: url }),
            None => ws_base_from_api(&api_base_url)?,
        };

        let millis = |key: &str, default: u64| Duration::from_millis(parse_u64(lookup(key), default));
        Ok(Self {
            poll_interval: millis("LIVEDECK_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            frame_delay: millis("LIVEDECK_FRAME_DELAY_MS", DEFAULT_FRAME_DELAY_MS),
            request_timeout: Duration::from_secs(parse_u64(
                lookup("LIVEDECK_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            reconnect_base: millis("LIVEDECK_RECONNECT_BASE_MS", DEFAULT_RECONNECT_BASE_MS),
            api_base_url,
            ws_base_url,
        })
    }

    /// Point the config at another API, re-deriving the websocket base.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrl`] when `url` is not `http(s)://`.
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let url = url.trim().trim_end_matches('/');
        self.ws_base_url = ws_base_from_api(url)?;
        self.api_base_url = url.to_string();
        Ok(self)
    }
}

/// `http://host` → `ws://host`, `https://host` → `wss://host`.
///
/// # Errors
///
/// [`ConfigError::InvalidUrl`] for any other scheme.
pub fn ws_base_from_api(api_base_url: &str) -> Result<String, ConfigError> {
    if let Some(rest) = api_base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}"));
    }
    if let Some(rest) = api_base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}"));
    }
    Err(ConfigError::InvalidUrl { var: "LIVEDECK_API_BASE_URL", value: api_base_url.to_string() })
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
