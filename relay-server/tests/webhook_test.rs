//! Integration tests for the webhook endpoint.
//!
//! The router under test is the real one; the dispatcher is backed by a
//! channel whose receiver the test holds, so every forwarding decision is
//! observable without a broker.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use leadrelay::web::app;
use leadrelay::{dispatch, AppState, Config, Dispatcher, InboundEvent, Publish, PublishTarget};

fn test_config() -> Config {
    Config {
        broker_url: "amqp://localhost:5672".to_string(),
        event_types: vec!["new_lead".to_string()],
        cloud_region: "us-central1".to_string(),
        zone_id: "a".to_string(),
        project_id: "demo-project".to_string(),
        topic_id: "leads".to_string(),
        port: 8080,
        dispatch_workers: 2,
        dispatch_capacity: 8,
        shutdown_drain_secs: 30,
    }
}

/// State with a test-held receiver in place of the worker pool.
fn test_state(capacity: usize) -> (AppState, mpsc::Receiver<InboundEvent>) {
    let (dispatcher, rx) = Dispatcher::bounded(capacity);
    (AppState::new(test_config(), dispatcher), rx)
}

/// Send a JSON body to `POST /` and return status plus raw response body.
async fn post_webhook(state: AppState, body: &Value) -> (StatusCode, Vec<u8>) {
    post_raw(state, serde_json::to_vec(body).unwrap()).await
}

async fn post_raw(state: AppState, body: Vec<u8>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_recognized_event_enqueued_with_full_payload() {
    let (state, mut rx) = test_state(8);

    let body = json!({
        "event_type": "new_lead",
        "api_partner": {"name": "Acme", "id": 42}
    });
    let (status, response) = post_webhook(state, &body).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response, json!({"id": 42}));

    // Exactly one event enqueued, equal to the full decoded body
    let event = rx.try_recv().expect("event should be enqueued");
    assert_eq!(serde_json::to_value(&event).unwrap(), body);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unrecognized_event_not_enqueued() {
    let (state, mut rx) = test_state(8);

    let body = json!({
        "event_type": "unknown_type",
        "api_partner": {"id": 7}
    });
    let (status, response) = post_webhook(state, &body).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response, json!({"id": 7}));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_event_type_not_enqueued() {
    let (state, mut rx) = test_state(8);

    let body = json!({"api_partner": {"id": 1}});
    let (status, response) = post_webhook(state, &body).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response, json!({"id": 1}));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_api_partner_returns_empty_body() {
    let (state, mut rx) = test_state(8);

    let body = json!({"event_type": "new_lead"});
    let (status, response) = post_webhook(state, &body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(response.is_empty());

    // Still forwarded: the response shape and the publish decision are
    // independent
    let event = rx.try_recv().expect("event should be enqueued");
    assert_eq!(event.event_type.as_deref(), Some("new_lead"));
}

#[tokio::test]
async fn test_partner_fields_other_than_name_survive() {
    let (state, _rx) = test_state(8);

    let body = json!({
        "event_type": "new_lead",
        "api_partner": {"name": "Acme", "id": 42, "tier": "gold"}
    });
    let (status, response) = post_webhook(state, &body).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response, json!({"id": 42, "tier": "gold"}));
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let (state, mut rx) = test_state(8);

    let (status, response) = post_raw(state, b"{not json".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response, json!({"status": "invalid_body"}));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_non_object_body_rejected() {
    let (state, mut rx) = test_state(8);

    let (status, _) = post_webhook(state, &json!([1, 2, 3])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_full_queue_still_returns_ok() {
    // Capacity 1 and nobody consuming: the second qualifying request finds
    // the queue full
    let (state, _rx) = test_state(1);

    let body = json!({"event_type": "new_lead", "api_partner": {"id": 1}});
    let (status, _) = post_webhook(state.clone(), &body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, response) = post_webhook(state, &body).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response, json!({"id": 1}));
}

/// Publisher double that never completes a publish.
struct BlockingPublisher;

#[async_trait::async_trait]
impl Publish for BlockingPublisher {
    async fn publish(&self, _target: &PublishTarget, _body: &[u8]) -> anyhow::Result<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_response_does_not_wait_on_publish() {
    // Full pipeline with a publisher that blocks forever: the response must
    // still come back promptly.
    let config = test_config();
    let target = PublishTarget::from_config(&config);
    let (dispatcher, _pool) = dispatch::spawn(Arc::new(BlockingPublisher), target, 1, 8);
    let state = AppState::new(config, dispatcher);

    let body = json!({"event_type": "new_lead", "api_partner": {"id": 9}});
    let response = tokio::time::timeout(Duration::from_secs(1), post_webhook(state, &body))
        .await
        .expect("response must not wait on the publisher");

    assert_eq!(response.0, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _rx) = test_state(8);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}
