//! Configuration types for the DMT SDK.

use crate::error::{DmtError, DmtResult};
use std::time::Duration;
use url::Url;

/// Default MPS REST base, matching a local DMT deployment.
pub const DEFAULT_MPS_URL: &str = "http://localhost:8181/api/v1";
/// Default RPS REST base, matching a local DMT deployment.
pub const DEFAULT_RPS_URL: &str = "http://localhost:8081/api/v1";
/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("dmt-mcp/", env!("CARGO_PKG_VERSION"));

/// Username/password pair used to obtain a bearer token from MPS.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Create credentials, rejecting blank values.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> DmtResult<Self> {
        let username = username.into().trim().to_string();
        let password = password.into();

        if username.is_empty() {
            return Err(DmtError::Config("username must not be empty".to_string()));
        }
        if password.trim().is_empty() {
            return Err(DmtError::Config("password must not be empty".to_string()));
        }

        Ok(Self { username, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for the DMT client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the MPS REST API (e.g. `http://host:8181/api/v1/`).
    pub mps_url: Url,
    /// Base URL of the RPS REST API.
    pub rps_url: Url,
    /// Credentials exchanged for a bearer token.
    pub credentials: Credentials,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry_config: RetryConfig,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration pointing at the default local deployment.
    pub fn new(credentials: Credentials) -> DmtResult<Self> {
        Ok(Self {
            mps_url: parse_base_url(DEFAULT_MPS_URL)?,
            rps_url: parse_base_url(DEFAULT_RPS_URL)?,
            credentials,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }
}

/// Parse a REST base URL so that relative paths join beneath it.
///
/// `Url::join` replaces the last path segment unless the base ends in `/`.
pub fn parse_base_url(raw: &str) -> DmtResult<Url> {
    let trimmed = raw.trim();
    let url = if trimmed.ends_with('/') {
        Url::parse(trimmed)?
    } else {
        Url::parse(&format!("{}/", trimmed))?
    };

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DmtError::Config(format!(
            "unsupported URL scheme `{}` in {}",
            other, trimmed
        ))),
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
    /// HTTP status codes to retry on.
    pub retry_on_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            retry_on_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate backoff duration for a given attempt.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let backoff = Duration::from_millis(backoff_ms as u64);
        std::cmp::min(backoff, self.max_backoff)
    }

    /// Check if a status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status_codes.contains(&status)
    }
}
