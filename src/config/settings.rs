//! Service settings loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SESSION_IDLE_SECS, DEFAULT_TOKEN_ENDPOINT};

/// Settings for the token service and the chat front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// URL of the remote token endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for a single token request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Directory where token artifacts are written before delivery.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory holding uploaded credential files while a session is open.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Minimum interval between progress message edits in milliseconds.
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// Seconds of inactivity after which a session and its upload are dropped.
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,

    /// Channel users are asked to join before starting.
    #[serde(default = "default_channel_link")]
    pub channel_link: String,

    /// Owner handle shown in the welcome message.
    #[serde(default = "default_bot_owner")]
    pub bot_owner: String,

    /// Version string shown in the welcome message.
    #[serde(default = "default_bot_version")]
    pub bot_version: String,
}

fn default_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_owned()
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_upload_dir() -> PathBuf {
    std::env::temp_dir()
}

const fn default_progress_interval() -> u64 {
    100
}

const fn default_session_idle() -> u64 {
    DEFAULT_SESSION_IDLE_SECS
}

fn default_channel_link() -> String {
    "https://t.me/nr_codex".to_owned()
}

fn default_bot_owner() -> String {
    "@nilay_vii".to_owned()
}

fn default_bot_version() -> String {
    "1.0".to_owned()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            output_dir: default_output_dir(),
            upload_dir: default_upload_dir(),
            progress_interval_ms: default_progress_interval(),
            session_idle_secs: default_session_idle(),
            channel_link: default_channel_link(),
            bot_owner: default_bot_owner(),
            bot_version: default_bot_version(),
        }
    }
}

impl ServiceSettings {
    /// Creates settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            endpoint: std::env::var("TOKEN_ENDPOINT").unwrap_or_else(|_| default_endpoint()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_request_timeout),
            output_dir: std::env::var("OUTPUT_DIR")
                .map_or_else(|_| default_output_dir(), PathBuf::from),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map_or_else(|_| default_upload_dir(), PathBuf::from),
            progress_interval_ms: std::env::var("PROGRESS_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_progress_interval),
            session_idle_secs: std::env::var("SESSION_IDLE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_session_idle),
            channel_link: std::env::var("CHANNEL_LINK").unwrap_or_else(|_| default_channel_link()),
            bot_owner: std::env::var("BOT_OWNER").unwrap_or_else(|_| default_bot_owner()),
            bot_version: std::env::var("BOT_VERSION").unwrap_or_else(|_| default_bot_version()),
        }
    }

    /// Checks that the settings can be used to build a token client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid http(s) URL, or if
    /// the request timeout or session idle timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {e}", self.endpoint)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{}: unsupported scheme '{}'",
                self.endpoint,
                url.scheme()
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.session_idle_secs == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }

        Ok(())
    }

    /// Timeout applied to each token request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Minimum interval between progress edits.
    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Inactivity after which an unfinished session is discarded.
    #[must_use]
    pub const fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid token endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Session idle timeout must be greater than zero")]
    ZeroIdleTimeout,
}
