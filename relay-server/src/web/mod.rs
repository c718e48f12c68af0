//! Web server module for the webhook endpoint.
//!
//! The server receives webhook notifications on `POST /`, hands qualifying
//! events to the dispatch queue, and answers from the payload's
//! `api_partner` field. A `GET /health` liveness probe rides alongside.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, webhook, AppState, ErrorResponse, HealthResponse};

/// Build the application router. Shared by the binary and the endpoint
/// tests so both drive identical routing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
