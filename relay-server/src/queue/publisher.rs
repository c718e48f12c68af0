//! AMQP publisher for forwarding events to the topic queue.
//!
//! The adapter opens a fresh connection for each publish call and releases
//! it before returning, success or failure. Workers therefore never share
//! broker state and can publish concurrently without coordination.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Connection, ConnectionProperties,
};
use tracing::{info, warn};

use super::types::PublishTarget;

/// Publish seam between the dispatcher and the broker client.
#[async_trait]
pub trait Publish: Send + Sync {
    /// Publish one message body to the target topic.
    async fn publish(&self, target: &PublishTarget, body: &[u8]) -> Result<()>;
}

/// AMQP publisher with per-call connection scoping.
pub struct AmqpPublisher {
    url: String,
}

impl AmqpPublisher {
    /// Create a new publisher for the given broker URL.
    pub fn new(url: String) -> Self {
        Self { url }
    }

    async fn publish_on(
        &self,
        conn: &Connection,
        target: &PublishTarget,
        body: &[u8],
    ) -> Result<()> {
        let topic_path = target.topic_path();

        let channel = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        // Declare the target queue (idempotent operation)
        channel
            .queue_declare(
                &topic_path,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare topic queue")?;

        channel
            .basic_publish(
                "",
                &topic_path,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into()),
            )
            .await
            .context("Failed to publish to topic queue")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            topic = %topic_path,
            body_length = body.len(),
            "amqp_event_published"
        );

        Ok(())
    }
}

#[async_trait]
impl Publish for AmqpPublisher {
    async fn publish(&self, target: &PublishTarget, body: &[u8]) -> Result<()> {
        let conn = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to broker")?;

        let result = self.publish_on(&conn, target, body).await;

        // Scoped acquisition: the connection is released whether or not the
        // publish succeeded.
        if let Err(e) = conn.close(200, "publish complete").await {
            warn!(error = %e, "amqp_connection_close_error");
        }

        result
    }
}
