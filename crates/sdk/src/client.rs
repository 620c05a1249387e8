//! Main client for the DMT SDK.

use crate::api::*;
use crate::config::{parse_base_url, ClientConfig, Credentials, RetryConfig, DEFAULT_MPS_URL, DEFAULT_RPS_URL, DEFAULT_USER_AGENT};
use crate::error::{DmtError, DmtResult};
use crate::session::Session;
use crate::transport::HttpTransport;
use reqwest::{header, Client};
use std::sync::Arc;
use std::time::Duration;

/// Main client for the MPS and RPS REST APIs.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Clone)]
pub struct DmtClient {
    config: Arc<ClientConfig>,
    session: Arc<Session>,
    http: Client,
    pub(crate) mps: HttpTransport,
    pub(crate) rps: HttpTransport,
}

impl DmtClient {
    /// Create a new client builder.
    pub fn builder() -> DmtClientBuilder {
        DmtClientBuilder::new()
    }

    /// Create a client from configuration. No request is sent until
    /// [`DmtClient::authorize`] is called.
    pub fn from_config(config: ClientConfig) -> DmtResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        let session = Arc::new(Session::new(config.credentials.clone(), &config.mps_url)?);
        let mps = HttpTransport::new(
            http.clone(),
            config.mps_url.clone(),
            config.retry_config.clone(),
            session.clone(),
        );
        let rps = HttpTransport::new(
            http.clone(),
            config.rps_url.clone(),
            config.retry_config.clone(),
            session.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            session,
            http,
            mps,
            rps,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Obtain a bearer token from MPS.
    pub async fn authorize(&self) -> DmtResult<()> {
        self.session.authorize(&self.http).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Authorize unless a token is already held.
    pub async fn ensure_authenticated(&self) -> DmtResult<()> {
        if self.session.is_authenticated().await {
            return Ok(());
        }
        self.authorize().await
    }

    /// Get the devices API.
    pub fn devices(&self) -> DevicesApi<'_> {
        DevicesApi::new(self)
    }

    /// Get the power API.
    pub fn power(&self) -> PowerApi<'_> {
        PowerApi::new(self)
    }

    /// Get the AMT information and logs API.
    pub fn amt(&self) -> AmtApi<'_> {
        AmtApi::new(self)
    }

    /// Get the RPS provisioning API.
    pub fn provisioning(&self) -> ProvisioningApi<'_> {
        ProvisioningApi::new(self)
    }
}

impl std::fmt::Debug for DmtClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmtClient")
            .field("mps_url", &self.config.mps_url.as_str())
            .field("rps_url", &self.config.rps_url.as_str())
            .field("username", &self.session.username())
            .finish()
    }
}

/// Builder for creating a DmtClient.
pub struct DmtClientBuilder {
    mps_url: String,
    rps_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
    retry_config: RetryConfig,
    user_agent: String,
}

impl DmtClientBuilder {
    /// Create a new builder targeting the default local deployment.
    pub fn new() -> Self {
        Self {
            mps_url: DEFAULT_MPS_URL.to_string(),
            rps_url: DEFAULT_RPS_URL.to_string(),
            credentials: None,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the MPS REST base URL.
    pub fn mps_url(mut self, url: impl Into<String>) -> Self {
        self.mps_url = url.into();
        self
    }

    /// Set the RPS REST base URL.
    pub fn rps_url(mut self, url: impl Into<String>) -> Self {
        self.rps_url = url.into();
        self
    }

    /// Set the credentials exchanged for a bearer token.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client.
    pub fn build(self) -> DmtResult<DmtClient> {
        let credentials = self
            .credentials
            .ok_or_else(|| DmtError::Config("credentials are required".to_string()))?;

        let config = ClientConfig {
            mps_url: parse_base_url(&self.mps_url)?,
            rps_url: parse_base_url(&self.rps_url)?,
            credentials,
            timeout: self.timeout,
            retry_config: self.retry_config,
            user_agent: self.user_agent,
        };

        DmtClient::from_config(config)
    }
}

impl Default for DmtClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
