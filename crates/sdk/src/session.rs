//! Bearer-token session against MPS.

use crate::config::Credentials;
use crate::error::{DmtError, DmtResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// Holds the credentials and the token obtained from `POST /authorize`.
///
/// The token is `None` until authorization succeeds, and is cleared when a
/// server rejects it. Transports refuse to send authenticated requests while
/// it is `None`.
pub struct Session {
    credentials: Credentials,
    authorize_url: Url,
    token: RwLock<Option<String>>,
    // Serializes re-authorization so concurrent 401s trigger one login.
    refresh_lock: Mutex<()>,
}

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthorizeResponse {
    #[serde(default)]
    token: Option<String>,
}

impl Session {
    /// Create an unauthenticated session for the MPS at `mps_url`.
    pub fn new(credentials: Credentials, mps_url: &Url) -> DmtResult<Self> {
        Ok(Self {
            credentials,
            authorize_url: mps_url.join("authorize")?,
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Current bearer token, if authorized.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Drop the current token.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    #[cfg(test)]
    pub(crate) async fn set_token(&self, token: &str) {
        *self.token.write().await = Some(token.to_string());
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Exchange the credentials for a bearer token and store it.
    pub async fn authorize(&self, client: &Client) -> DmtResult<()> {
        debug!(url = %self.authorize_url, "Requesting MPS token");

        let body = AuthorizeRequest {
            username: &self.credentials.username,
            password: &self.credentials.password,
        };

        // A failed attempt must not leave an older token usable
        self.invalidate().await;

        let response = client.post(self.authorize_url.clone()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = DmtError::from_response(status.as_u16(), &text);
            warn!(username = %self.credentials.username, status = status.as_u16(), "MPS authorization rejected");
            return Err(match error {
                DmtError::Authentication(message) => DmtError::Authentication(message),
                other => DmtError::Authentication(other.to_string()),
            });
        }

        let parsed: AuthorizeResponse = response.json().await?;
        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DmtError::UnexpectedResponse("authorize response has no token".to_string()))?;

        *self.token.write().await = Some(token);
        info!(username = %self.credentials.username, "Authorized with MPS");
        Ok(())
    }

    /// Re-authorize after `stale` was rejected.
    ///
    /// A no-op when another task already replaced the stale token.
    pub async fn refresh(&self, client: &Client, stale: &str) -> DmtResult<()> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.token().await {
            if current != stale {
                debug!("Token already refreshed by another request");
                return Ok(());
            }
        }

        self.authorize(client).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("authorize_url", &self.authorize_url)
            .finish_non_exhaustive()
    }
}
