use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use trip_relay::TripPlanner;
use trip_relay::budget::BudgetStatus;
use trip_relay::endpoint::{CompletionEndpoint, CredentialSource, Sampling, router};
use trip_relay::error::{Result, TripRelayError};
use trip_relay::expenses::MemoryExpenseStore;
use trip_relay::models::{
    ChatTurn, Choice, CompletionRequest, ProviderMessage, ProviderRequest, ProviderResponse, Usage,
};
use trip_relay::relay::{HttpRelayClient, RelayClient};
use trip_relay::store::{MemoryTripStore, TripStore};
use trip_relay::transport::ProviderTransport;

const DUBAI_JSON: &str = r#"{"destination": "Dubai, UAE", "origin": "Not specified", "travelers": 4, "duration": "8 days", "startDate": "2024-10-10", "endDate": "2024-10-17", "budget": "Not specified", "interests": [], "travelMode": "Flight"}"#;

/// Provider stand-in that returns a fixed reply and counts calls.
struct CannedProvider {
    reply: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl CannedProvider {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProviderTransport for CannedProvider {
    async fn chat(&self, _req: &ProviderRequest, _api_key: &str) -> Result<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(content) => Ok(ProviderResponse {
                choices: vec![Choice {
                    message: ProviderMessage {
                        content: Some(content.clone()),
                    },
                }],
                usage: Some(Usage {
                    total_tokens: 42,
                    ..Default::default()
                }),
            }),
            Err(message) => Err(TripRelayError::Provider(message.clone())),
        }
    }
}

/// Serve the endpoint on a loopback port and return its URL.
async fn serve(provider: Arc<CannedProvider>, key: Option<&str>) -> String {
    let endpoint = CompletionEndpoint::new(
        provider,
        CredentialSource::Fixed(key.map(str::to_string)),
        Sampling::new("gpt-4o"),
    );
    let app = router(endpoint, "/chat-completion");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    format!("http://{addr}/chat-completion")
}

#[tokio::test]
async fn relay_returns_content_and_usage() {
    let url = serve(CannedProvider::ok("Hello from Dubai"), Some("sk-test")).await;
    let client = HttpRelayClient::new(url).with_anon_key("anon");

    let result = client
        .complete(&CompletionRequest::new(vec![ChatTurn::user("hi")]))
        .await
        .expect("relay should succeed");

    assert_eq!(result.content, "Hello from Dubai");
    assert_eq!(result.usage.map(|u| u.total_tokens), Some(42));
}

#[tokio::test]
async fn relay_surfaces_provider_message() {
    let url = serve(CannedProvider::failing("model overloaded"), Some("sk-test")).await;
    let client = HttpRelayClient::new(url);

    let err = client
        .complete(&CompletionRequest::new(vec![ChatTurn::user("hi")]))
        .await
        .unwrap_err();

    match err {
        TripRelayError::Relay(message) => assert_eq!(message, "model overloaded"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_credential_fails_without_provider_call() {
    let provider = CannedProvider::ok("unused");
    let url = serve(provider.clone(), None).await;
    let client = HttpRelayClient::new(url);

    let err = client
        .complete(&CompletionRequest::new(vec![ChatTurn::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, TripRelayError::Relay(ref m) if m.contains("Configuration error")));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_relay_error() {
    // Grab a free port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpRelayClient::new(format!("http://{addr}/chat-completion"));
    let err = client
        .complete(&CompletionRequest::new(vec![ChatTurn::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, TripRelayError::Relay(_)));
}

#[tokio::test]
async fn extraction_end_to_end() {
    let url = serve(CannedProvider::ok(DUBAI_JSON), Some("sk-test")).await;
    let trips = Arc::new(MemoryTripStore::new());
    let planner = TripPlanner::new(
        Arc::new(HttpRelayClient::new(url)),
        trips.clone(),
        Arc::new(MemoryExpenseStore::new()),
    );

    let record = planner
        .extractor
        .extract("We are 4 people going to Dubai from October 10 to 17")
        .await
        .expect("relay should succeed")
        .expect("trip should be extracted");

    assert_eq!(record.destination, "Dubai, UAE");
    assert_eq!(record.travelers, 4);
    assert_eq!(record.start_date, "2024-10-10");
    assert_eq!(record.end_date, "2024-10-17");
    assert_eq!(trips.get().await.unwrap(), Some(record));
}

#[tokio::test]
async fn prose_reply_extracts_nothing() {
    let url = serve(
        CannedProvider::ok("Sure! You are heading to Dubai with 4 people."),
        Some("sk-test"),
    )
    .await;
    let trips = Arc::new(MemoryTripStore::new());
    let planner = TripPlanner::new(
        Arc::new(HttpRelayClient::new(url)),
        trips.clone(),
        Arc::new(MemoryExpenseStore::new()),
    );

    assert!(planner.extractor.extract("Dubai for 4").await.unwrap().is_none());
    assert!(trips.get().await.unwrap().is_none());
}

#[tokio::test]
async fn chat_session_over_http() {
    let url = serve(CannedProvider::ok("Visit the Burj Khalifa."), Some("sk-test")).await;
    let planner = TripPlanner::new(
        Arc::new(HttpRelayClient::new(url)),
        Arc::new(MemoryTripStore::new()),
        Arc::new(MemoryExpenseStore::new()),
    );

    let mut chat = planner.chat();
    let reply = chat.send("What should I see first?").await.unwrap();
    assert_eq!(reply, "Visit the Burj Khalifa.");
    assert_eq!(chat.history().len(), 2);
}

/// Serve an arbitrary router on a loopback port and return the URL of `/chat-completion`.
async fn serve_raw(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    format!("http://{addr}/chat-completion")
}

#[tokio::test]
async fn non_json_error_status_falls_back_to_status_text() {
    let app = axum::Router::new().route(
        "/chat-completion",
        axum::routing::post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let client = HttpRelayClient::new(serve_raw(app).await);

    let err = client
        .complete(&CompletionRequest::new(vec![ChatTurn::user("hi")]))
        .await
        .unwrap_err();

    match err {
        TripRelayError::Relay(message) => {
            assert_eq!(message, "Completion endpoint returned 502 Bad Gateway")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn success_status_with_foreign_body_is_rejected() {
    let app = axum::Router::new().route(
        "/chat-completion",
        axum::routing::post(|| async { axum::Json(serde_json::json!({"ok": true})) }),
    );
    let client = HttpRelayClient::new(serve_raw(app).await);

    let err = client
        .complete(&CompletionRequest::new(vec![ChatTurn::user("hi")]))
        .await
        .unwrap_err();

    match err {
        TripRelayError::Relay(message) => {
            assert!(message.starts_with("Unexpected completion endpoint response"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn budget_advice_over_http() {
    let url = serve(
        CannedProvider::ok(r#"{"budgetStatus": "under-budget", "savingTips": ["Take the metro"]}"#),
        Some("sk-test"),
    )
    .await;
    let planner = TripPlanner::new(
        Arc::new(HttpRelayClient::new(url)),
        Arc::new(MemoryTripStore::new()),
        Arc::new(MemoryExpenseStore::new()),
    );

    let advice = planner
        .advisor()
        .advise(Some(1500.0))
        .await
        .expect("relay should succeed")
        .expect("advice should parse");
    assert_eq!(advice.budget_status, BudgetStatus::UnderBudget);
    assert_eq!(advice.saving_tips, vec!["Take the metro".to_string()]);
}
