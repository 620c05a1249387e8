//! HTTP transport layer for the DMT SDK.

use crate::config::RetryConfig;
use crate::error::{DmtError, DmtResult};
use crate::session::Session;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// HTTP transport bound to one REST base URL (MPS or RPS).
///
/// Every request carries the session's bearer token. Without a token the
/// request is refused locally and never reaches the server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    retry_config: RetryConfig,
    session: Arc<Session>,
}

impl HttpTransport {
    /// Create a transport sharing `client`'s connection pool.
    pub fn new(client: Client, base_url: Url, retry_config: RetryConfig, session: Arc<Session>) -> Self {
        Self {
            client,
            base_url,
            retry_config,
            session,
        }
    }

    /// Build a URL for the given path.
    fn build_url(&self, path: &str) -> DmtResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send an authenticated request, re-authorizing once on 401.
    async fn execute(&self, request_builder: RequestBuilder, idempotent: bool) -> DmtResult<Response> {
        let token = self.session.token().await.ok_or(DmtError::NotAuthenticated)?;

        match self
            .execute_with_retry(&request_builder, &token, idempotent)
            .await
        {
            Err(DmtError::Authentication(message)) => {
                warn!(%message, "Bearer token rejected, re-authorizing");
                self.session.refresh(&self.client, &token).await?;
                let token = self.session.token().await.ok_or(DmtError::NotAuthenticated)?;
                self.execute_with_retry(&request_builder, &token, idempotent)
                    .await
            }
            other => other,
        }
    }

    /// Execute a request with retries. Non-idempotent requests are sent once.
    async fn execute_with_retry(
        &self,
        request_builder: &RequestBuilder,
        token: &str,
        idempotent: bool,
    ) -> DmtResult<Response> {
        let max_retries = if idempotent {
            self.retry_config.max_retries
        } else {
            0
        };
        let mut attempts = 0;

        loop {
            let request = request_builder
                .try_clone()
                .ok_or_else(|| DmtError::Config("Request cannot be cloned".to_string()))?
                .bearer_auth(token);

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if response.status().is_success() {
                        return Ok(response);
                    }

                    if attempts < max_retries && self.retry_config.should_retry_status(status) {
                        let backoff = self.retry_config.backoff_for_attempt(attempts);
                        warn!(
                            status = status,
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(DmtError::from_response(status, &body));
                }
                Err(e) => {
                    if attempts < max_retries && (e.is_timeout() || e.is_connect()) {
                        let backoff = self.retry_config.backoff_for_attempt(attempts);
                        warn!(
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            error = %e,
                            "Request could not be completed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Execute a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> DmtResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request");

        let response = self.execute(self.client.get(url), true).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Execute a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> DmtResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request with query");

        let response = self
            .execute(self.client.get(url).query(query), true)
            .await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Execute a POST request. POSTs are never retried.
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> DmtResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "POST request");

        let response = self
            .execute(self.client.post(url).json(body), false)
            .await?;
        let body = response.json().await?;
        Ok(body)
    }
}
