//! LeadRelay Web Server - webhook receiver and queue forwarder.
//!
//! This binary:
//! - Receives webhook notifications on `POST /`
//! - Hands qualifying events to a bounded dispatch queue
//! - Publishes them to the configured topic from a fixed worker pool
//! - Answers each request from the payload's `api_partner` field
//!
//! The response path never waits on a publish.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use leadrelay::queue::Publish;
use leadrelay::web::app;
use leadrelay::{dispatch, AmqpPublisher, AppState, Config, PublishTarget};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration; missing required values are fatal here
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        event_types = ?config.event_types,
        project_id = %config.project_id,
        topic_id = %config.topic_id,
        dispatch_workers = config.dispatch_workers,
        "config_loaded"
    );

    // Start the publisher worker pool
    let publisher: Arc<dyn Publish> = Arc::new(AmqpPublisher::new(config.broker_url.clone()));
    let target = PublishTarget::from_config(&config);
    let (dispatcher, pool) = dispatch::spawn(
        publisher,
        target,
        config.dispatch_workers,
        config.dispatch_capacity,
    );

    let drain_timeout = Duration::from_secs(config.shutdown_drain_secs);
    let port = config.port;

    // Create application state and router
    let state = AppState::new(config, dispatcher);
    let router = app(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // All dispatcher handles dropped with the server; let the workers
    // finish the queued backlog before exiting.
    pool.drain(drain_timeout).await;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
