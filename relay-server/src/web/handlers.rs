//! Webhook endpoint handlers.
//!
//! The webhook handler does four things:
//! 1. Decode the body into an [`InboundEvent`]
//! 2. Hand qualifying events to the dispatch queue, without waiting
//! 3. Build the response from `api_partner`
//! 4. Return 200
//!
//! Publishing happens in the background workers; the response never waits
//! on it.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;
use crate::queue::InboundEvent;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Webhook
// =============================================================================

/// Error response for rejected request bodies.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
}

/// Webhook endpoint.
///
/// The body must be a JSON object; anything else is rejected with 400.
/// Beyond that no schema is enforced: a missing or unrecognized
/// `event_type` and a missing `api_partner` are ordinary non-error states
/// that still return 200.
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> Response {
    info!(body_length = body.len(), "webhook_received");

    let event: InboundEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(
                error = %e,
                body_preview = %String::from_utf8_lossy(&body[..body.len().min(500)]),
                "webhook_body_invalid"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    status: "invalid_body",
                }),
            )
                .into_response();
        }
    };

    info!(payload = ?event, "webhook_decoded");

    // Forward a snapshot if the event type qualifies. The submission is
    // non-blocking and its outcome never shapes the response.
    match event.event_type.as_deref() {
        Some(event_type) if state.config.recognizes_event(event_type) => {
            match state.dispatcher.try_dispatch(event.clone()) {
                Ok(()) => info!(event_type = event_type, "event_enqueued"),
                Err(e) => {
                    error!(event_type = event_type, error = %e, "event_enqueue_failed");
                }
            }
        }
        other => {
            warn!(event_type = ?other, payload = ?event, "event_type_unrecognized");
        }
    }

    match event.partner_response() {
        Some(partner) => (StatusCode::OK, Json(Value::Object(partner))).into_response(),
        None => {
            warn!(payload = ?event, "api_partner_missing");
            StatusCode::OK.into_response()
        }
    }
}
