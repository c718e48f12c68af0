//! Queue module for broker operations.
//!
//! This module provides:
//! - The inbound event and publish target types
//! - The publish seam and its AMQP implementation

pub mod publisher;
pub mod types;

pub use publisher::{AmqpPublisher, Publish};
pub use types::{InboundEvent, PublishTarget};
