//! Stateless completion endpoint: prepends a system turn and forwards the
//! conversation to the provider with fixed sampling parameters.

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::{Result, TripRelayError};
use crate::models::{ChatTurn, CompletionRequest, CompletionResult, ErrorBody, ProviderRequest, Role};
use crate::transport::ProviderTransport;

pub const DEFAULT_PERSONA: &str = "You are a helpful AI travel assistant specialized in Dubai. Help users plan their trips, provide travel advice, and assist with travel-related questions. Be detailed, practical, and friendly.";

pub const HEALTH_PATH: &str = "/health";

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Where the provider credential comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Environment variable, read on every request.
    Env(String),
    Fixed(Option<String>),
}

impl CredentialSource {
    fn resolve(&self) -> Option<String> {
        match self {
            Self::Env(name) => std::env::var(name).ok(),
            Self::Fixed(value) => value.clone(),
        }
        .filter(|key| !key.trim().is_empty())
    }

    fn describe(&self) -> String {
        match self {
            Self::Env(name) => format!("{name} not set"),
            Self::Fixed(_) => "provider API key not configured".to_string(),
        }
    }
}

/// Token ceiling sent with every provider request.
pub const MAX_TOKENS: u32 = 2000;
pub const TEMPERATURE: f32 = 0.7;

/// Model selection; token ceiling and temperature are not configurable.
#[derive(Debug, Clone)]
pub struct Sampling {
    pub model: String,
}

impl Sampling {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl From<&ProviderConfig> for Sampling {
    fn from(cfg: &ProviderConfig) -> Self {
        Self::new(cfg.model.clone())
    }
}

#[derive(Clone)]
pub struct CompletionEndpoint {
    transport: Arc<dyn ProviderTransport>,
    credentials: CredentialSource,
    sampling: Sampling,
}

impl CompletionEndpoint {
    pub fn new(
        transport: Arc<dyn ProviderTransport>,
        credentials: CredentialSource,
        sampling: Sampling,
    ) -> Self {
        Self {
            transport,
            credentials,
            sampling,
        }
    }

    /// Handle one relay request end to end.
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult> {
        if request.messages.iter().any(|turn| turn.role == Role::System) {
            return Err(TripRelayError::Validation(
                "messages may only contain user and assistant turns".to_string(),
            ));
        }

        let api_key = self
            .credentials
            .resolve()
            .ok_or_else(|| TripRelayError::Configuration(self.credentials.describe()))?;

        let system_prompt = request
            .system_prompt
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatTurn::system(system_prompt));
        messages.extend(request.messages);

        let provider_request = ProviderRequest {
            model: self.sampling.model.clone(),
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::info!(
            model = %provider_request.model,
            turns = provider_request.messages.len(),
            "Forwarding completion request"
        );

        let response = self.transport.chat(&provider_request, &api_key).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                TripRelayError::Provider("Provider returned empty choices".to_string())
            })?;

        Ok(CompletionResult {
            content,
            usage: response.usage,
        })
    }
}

/// Routes for the completion endpoint, wrapped in the open CORS policy.
pub fn router(endpoint: CompletionEndpoint, path: &str) -> Router {
    Router::new()
        .route(path, post(chat_completion))
        .route(HEALTH_PATH, get(|| async { "ok" }))
        .fallback(not_found)
        .with_state(endpoint)
        .layer(middleware::from_fn(cors))
}

async fn chat_completion(
    State(endpoint): State<CompletionEndpoint>,
    body: Bytes,
) -> Response {
    // Body is JSON whatever the declared content type.
    let request: CompletionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected completion request body: {}", e);
            return error_response(&TripRelayError::Validation(format!(
                "Invalid request body: {e}"
            )));
        }
    };

    match endpoint.complete(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!("Completion endpoint error: {}", e);
            error_response(&e)
        }
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
        .into_response()
}

fn error_response(e: &TripRelayError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
        .into_response()
}

async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        (StatusCode::OK, "ok").into_response()
    } else {
        next.run(req).await
    };
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}
