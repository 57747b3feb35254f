//! HTTP client for the token endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ServiceSettings;

/// JSON field holding the token in a successful response.
pub const TOKEN_FIELD: &str = "JWT TOKEN";

/// Why a single token request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("Connection timeout")]
    Timeout,

    #[error("HTTP error {0}")]
    HttpStatus(u16),

    #[error("{0}")]
    Other(String),
}

/// Result of exchanging one credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { token: String },
    Failure { reason: FetchFailure },
}

impl FetchOutcome {
    #[must_use]
    pub fn success(token: impl Into<String>) -> Self {
        Self::Success {
            token: token.into(),
        }
    }

    #[must_use]
    pub const fn failure(reason: FetchFailure) -> Self {
        Self::Failure { reason }
    }
}

/// Anything that can exchange a credential pair for a token.
#[async_trait]
pub trait TokenClient: Send + Sync {
    /// Performs one request. Never retries.
    async fn fetch(&self, identifier: &str, secret: &str) -> FetchOutcome;
}

/// Errors building the HTTP client.
#[derive(Debug, Error)]
pub enum TokenClientError {
    #[error("Invalid token endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Failed to create HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Token client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTokenClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTokenClient {
    /// Creates a client for the given endpoint and per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TokenClientError> {
        let endpoint = Url::parse(endpoint).map_err(|e| TokenClientError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            message: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    /// Creates a client from service settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint is invalid.
    pub fn from_settings(settings: &ServiceSettings) -> Result<Self, TokenClientError> {
        Self::new(&settings.endpoint, settings.request_timeout())
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, identifier: &str, secret: &str) -> Result<String, FetchFailure> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("uid", identifier), ("password", secret)])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchFailure::HttpStatus(status.as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| self.classify(e))?;

        body.get(TOKEN_FIELD)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                FetchFailure::Other(format!("response did not contain a {TOKEN_FIELD} field"))
            })
    }

    fn classify(&self, err: reqwest::Error) -> FetchFailure {
        if err.is_timeout() {
            debug!("Token request exceeded {:?}", self.timeout);
            FetchFailure::Timeout
        } else if let Some(status) = err.status() {
            FetchFailure::HttpStatus(status.as_u16())
        } else {
            // Drop the URL so the password in the query string never reaches logs or users.
            FetchFailure::Other(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl TokenClient for HttpTokenClient {
    async fn fetch(&self, identifier: &str, secret: &str) -> FetchOutcome {
        match self.request(identifier, secret).await {
            Ok(token) => FetchOutcome::success(token),
            Err(reason) => {
                warn!("Token request failed: {}", reason);
                FetchOutcome::failure(reason)
            }
        }
    }
}
