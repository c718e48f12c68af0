//! LeadRelay - webhook-to-queue relay for inbound lead events.
//!
//! This library backs the `leadrelay-web` binary: a thin adapter that
//! receives webhook notifications over HTTP, filters them by event type,
//! and forwards qualifying payloads to a publish/subscribe topic.
//!
//! ## Architecture
//!
//! ```text
//! Webhook → Web Server → dispatch queue → Publisher workers → Topic
//! ```

pub mod config;
pub mod dispatch;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{Dispatcher, WorkerPool};
pub use queue::{AmqpPublisher, InboundEvent, Publish, PublishTarget};
pub use web::AppState;
