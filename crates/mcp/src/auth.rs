// Authentication gate consulted before any tool call is dispatched

use anyhow::Result;
use dmt_sdk::DmtClient;

/// Decides whether tool calls may be forwarded to the remote servers
#[async_trait::async_trait]
pub trait AuthGate: Send + Sync {
    /// Succeed only when an authenticated session is available, attempting
    /// to establish one if needed
    async fn ensure_authenticated(&self) -> Result<()>;
}

#[async_trait::async_trait]
impl AuthGate for DmtClient {
    async fn ensure_authenticated(&self) -> Result<()> {
        DmtClient::ensure_authenticated(self).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::unauthorized_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_gate_authorizes_lazily() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mps/api/v1/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "jwt" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = unauthorized_client(&server);
        let gate: &dyn AuthGate = client.as_ref();

        gate.ensure_authenticated().await.unwrap();
        // Second call reuses the held token
        gate.ensure_authenticated().await.unwrap();
        assert!(client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_gate_fails_when_mps_rejects_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mps/api/v1/authorize"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = unauthorized_client(&server);
        let gate: &dyn AuthGate = client.as_ref();

        let err = gate.ensure_authenticated().await.unwrap_err();
        assert!(err.to_string().contains("Authentication failed"));
    }
}
