use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Result, TripRelayError};
use crate::models::{ProviderErrorEnvelope, ProviderRequest, ProviderResponse};

const FALLBACK_PROVIDER_ERROR: &str = "OpenAI API request failed";

/// Outbound call to the chat-completion provider. One call, no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn chat(&self, req: &ProviderRequest, api_key: &str) -> Result<ProviderResponse>;
}

pub struct OpenAiTransport {
    client: Client,
    api_url: String,
}

impl OpenAiTransport {
    pub fn new(api_url: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
        }
    }
}

#[async_trait]
impl ProviderTransport for OpenAiTransport {
    async fn chat(&self, req: &ProviderRequest, api_key: &str) -> Result<ProviderResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| {
                TripRelayError::Provider(format!("Failed to send request to provider: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TripRelayError::Provider(format!("Failed to read provider response: {e}"))
        })?;

        if !status.is_success() {
            tracing::error!(%status, body = %body, "Provider API error");
            return Err(TripRelayError::Provider(provider_error_message(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            TripRelayError::Provider(format!("Failed to parse provider response: {e}"))
        })
    }
}

/// Pull `error.message` out of a provider error body.
pub fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|detail| detail.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| FALLBACK_PROVIDER_ERROR.to_string())
}
