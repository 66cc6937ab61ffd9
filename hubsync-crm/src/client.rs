//! HubSpot HTTP client

use async_trait::async_trait;
use hubsync_core::{AccessToken, CrmError, CrmResponse, CrmResult, CrmTransport, SyncConfig};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Bearer-authenticated client for the HubSpot CRM API.
///
/// Non-2xx responses come back as [`CrmResponse`] values; only failures to
/// get any response at all become errors.
pub struct HubSpotClient {
    client: Client,
    token: AccessToken,
}

impl HubSpotClient {
    /// Create a client with a per-request timeout.
    pub fn new(token: AccessToken, timeout: Duration) -> CrmResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrmError::Transport {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, token })
    }

    pub fn from_config(config: &SyncConfig) -> CrmResult<Self> {
        Self::new(config.access_token.clone(), config.http_timeout)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> CrmResult<CrmResponse> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.token.expose()))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| CrmError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| CrmError::Transport {
            url: url.to_string(),
            reason: format!("Failed to read body (status {}): {}", status, e),
        })?;

        let body = serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::debug!(url, status, error = %e, "CRM response body is not JSON");
            JsonValue::Null
        });

        Ok(CrmResponse::new(status, body))
    }
}

#[async_trait]
impl CrmTransport for HubSpotClient {
    async fn get(&self, url: &str) -> CrmResult<CrmResponse> {
        self.send(url, self.client.get(url)).await
    }

    async fn post(&self, url: &str, body: &JsonValue) -> CrmResult<CrmResponse> {
        self.send(url, self.client.post(url).json(body)).await
    }
}

impl std::fmt::Debug for HubSpotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSpotClient")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
