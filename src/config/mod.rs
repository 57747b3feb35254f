//! Configuration module for the token batch bot.
//!
//! Handles loading and validation of the service settings: the remote
//! token endpoint, request timeout, output location and the bot profile
//! shown to users.

mod settings;

pub use settings::{ConfigError, ServiceSettings};

/// Remote endpoint used when `TOKEN_ENDPOINT` is not set.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://ariflexlabs-jwt-gen.onrender.com/fetch-token";

/// Per-request timeout used when `REQUEST_TIMEOUT_SECS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Session inactivity limit used when `SESSION_IDLE_SECS` is not set.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
