use async_trait::async_trait;
use reqwest::Client;

use crate::config::RelayConfig;
use crate::error::{Result, TripRelayError};
use crate::models::{CompletionRequest, CompletionResult, ErrorBody};

/// Client side of the completion endpoint. Each call is one outbound request;
/// callers decide whether to retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult>;
}

pub struct HttpRelayClient {
    client: Client,
    endpoint_url: String,
    anon_key: Option<String>,
}

impl HttpRelayClient {
    pub fn new(endpoint_url: String) -> Self {
        Self {
            client: Client::new(),
            endpoint_url,
            anon_key: None,
        }
    }

    /// Gateway key sent as both bearer token and `apikey` header.
    pub fn with_anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    pub fn from_config(cfg: &RelayConfig) -> Self {
        let client = Self::new(cfg.endpoint_url.clone());
        match &cfg.anon_key {
            Some(key) => client.with_anon_key(key.clone()),
            None => client,
        }
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult> {
        let mut builder = self.client.post(&self.endpoint_url).json(request);
        if let Some(key) = &self.anon_key {
            builder = builder
                .header("Authorization", format!("Bearer {key}"))
                .header("apikey", key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("Completion endpoint unreachable: {}", e);
            TripRelayError::Relay(format!("Failed to reach completion endpoint: {e}"))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TripRelayError::Relay(format!("Failed to read endpoint response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("Completion endpoint returned {status}"));
            tracing::warn!(%status, "Completion endpoint reported failure: {}", message);
            return Err(TripRelayError::Relay(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            TripRelayError::Relay(format!("Unexpected completion endpoint response: {e}"))
        })
    }
}
