//! HTTP-level tests for the notification service.
#![cfg(feature = "service")]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use notification_channels::service::{create_router, ServiceState};
use notification_channels::{
    AccessMode, AllowAll, ChannelTypeRegistry, InMemoryAuthorizer, NotificationChannel,
    NotificationConfig, NotifierError, Principal, StateNotifier,
};

const ALICE: &str = "https://alice.example/profile#me";

#[derive(Default)]
struct CountingNotifier {
    calls: AtomicUsize,
}

impl CountingNotifier {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateNotifier for CountingNotifier {
    async fn emit_state(&self, _channel: &NotificationChannel) -> Result<(), NotifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config() -> NotificationConfig {
    NotificationConfig::with_base_url("https://pod.example/")
}

fn router() -> Router {
    let config = config();
    let registry = ChannelTypeRegistry::with_defaults(&config).unwrap();
    let mut authorizer = InMemoryAuthorizer::new();
    authorizer
        .grant("https://pod.example/public/", Principal::Public, [AccessMode::Read])
        .grant("https://pod.example/alice/", Principal::Agent(ALICE.into()), [AccessMode::Read]);
    create_router(ServiceState::new(registry, Arc::new(authorizer), config))
}

async fn send(request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, content_type, body)
}

fn subscribe(path: &str, body: Value, web_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/ld+json");
    if let Some(web_id) = web_id {
        builder = builder.header(header::AUTHORIZATION, format!("WebID {web_id}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_storage_description() {
    let (status, content_type, body) =
        send(Request::get("/.notifications/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/ld+json"));
    assert_eq!(body["id"], "https://pod.example/.notifications/");
    let services = body["subscription"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[1]["channelType"], "WebhookChannel2023");
}

#[tokio::test]
async fn test_public_webhook_subscription() {
    let (status, content_type, body) = send(subscribe(
        "/.notifications/WebhookChannel2023/",
        json!({
            "type": "WebhookChannel2023",
            "topic": "/public/notes",
            "target": "https://example.org/hook",
        }),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/ld+json"));
    assert_eq!(body["topic"], "https://pod.example/public/notes");
    assert!(body["id"]
        .as_str()
        .unwrap()
        .starts_with("https://pod.example/.notifications/WebhookChannel2023/"));
}

#[tokio::test]
async fn test_socket_subscription_with_webid() {
    let (status, _, body) = send(subscribe(
        "/.notifications/WebSocketChannel2023/",
        json!({ "type": "WebSocketChannel2023", "topic": "https://pod.example/alice/inbox/" }),
        Some(ALICE),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["receiveFrom"]
        .as_str()
        .unwrap()
        .starts_with("wss://pod.example/.notifications/WebSocketChannel2023/"));
}

#[tokio::test]
async fn test_error_statuses() {
    let cases = [
        // Unknown endpoint
        (
            subscribe("/.notifications/Carrier/", json!({ "type": "Carrier" }), None),
            StatusCode::NOT_FOUND,
            "UNSUPPORTED_CHANNEL_TYPE",
        ),
        // Body type does not match the endpoint
        (
            subscribe(
                "/.notifications/WebhookChannel2023/",
                json!({ "type": "WebSocketChannel2023", "topic": "/public/" }),
                None,
            ),
            StatusCode::BAD_REQUEST,
            "INVALID_PAYLOAD",
        ),
        // Missing target
        (
            subscribe(
                "/.notifications/WebhookChannel2023/",
                json!({ "type": "WebhookChannel2023", "topic": "/public/" }),
                None,
            ),
            StatusCode::BAD_REQUEST,
            "INVALID_PAYLOAD",
        ),
        // Anonymous on a private topic
        (
            subscribe(
                "/.notifications/WebSocketChannel2023/",
                json!({ "type": "WebSocketChannel2023", "topic": "/alice/inbox/" }),
                None,
            ),
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
        ),
        // Another agent on a private topic
        (
            subscribe(
                "/.notifications/WebSocketChannel2023/",
                json!({ "type": "WebSocketChannel2023", "topic": "/alice/inbox/" }),
                Some("https://bob.example/profile#me"),
            ),
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
        ),
        // Malformed WebID
        (
            subscribe(
                "/.notifications/WebSocketChannel2023/",
                json!({ "type": "WebSocketChannel2023", "topic": "/public/" }),
                Some("bob"),
            ),
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
        ),
    ];

    for (request, expected_status, expected_code) in cases {
        let path = request.uri().to_string();
        let (status, _, body) = send(request).await;
        assert_eq!(status, expected_status, "{path}: {body}");
        assert_eq!(body["code"], expected_code, "{path}: {body}");
    }
}

#[tokio::test]
async fn test_validation_error_names_field() {
    let (status, _, body) = send(subscribe(
        "/.notifications/WebhookChannel2023/",
        json!({ "type": "WebhookChannel2023", "topic": "/public/", "target": "ftp://x.example/" }),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "target");
}

#[tokio::test]
async fn test_health_reports_fingerprint() {
    let (status, _, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel_type_count"], 2);
    assert_eq!(body["registry_fingerprint"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_endpoint_type_wins_over_other_listed_types() {
    // The socket type sorts first and would reject `target`
    let (status, _, body) = send(subscribe(
        "/.notifications/WebhookChannel2023/",
        json!({
            "type": ["WebhookChannel2023", "WebSocketChannel2023"],
            "topic": "https://pod.example/public/",
            "target": "https://example.org/hook",
        }),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["type"], "WebhookChannel2023");
    assert_eq!(body["target"], "https://example.org/hook");

    let (status, _, body) = send(subscribe(
        "/.notifications/WebSocketChannel2023/",
        json!({
            "type": ["WebhookChannel2023", "WebSocketChannel2023"],
            "topic": "https://pod.example/public/",
        }),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["type"], "WebSocketChannel2023");
    assert!(body.get("target").is_none());
}

#[tokio::test]
async fn test_webhook_state_emitted_after_body_is_read() {
    let config = config();
    let notifier = Arc::new(CountingNotifier::default());
    let registry = ChannelTypeRegistry::with_notifier(&config, notifier.clone()).unwrap();
    let router = create_router(ServiceState::new(registry, Arc::new(AllowAll), config));

    let response = router
        .oneshot(subscribe(
            "/.notifications/WebhookChannel2023/",
            json!({
                "type": "WebhookChannel2023",
                "topic": "/data/",
                "target": "https://example.org/hook",
                "state": "etag-1",
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(notifier.calls(), 0, "state emitted before the body was sent");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["state"], "etag-1");

    for _ in 0..100 {
        if notifier.calls() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(notifier.calls(), 1);
}
