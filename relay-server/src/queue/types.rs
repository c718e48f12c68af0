//! Message and target types for the forwarding path.
//!
//! [`InboundEvent`] is the decoded webhook body; the two fields the relay
//! inspects are typed, everything else rides along untouched in the
//! flattened residual map. [`PublishTarget`] names the topic a qualifying
//! event is forwarded to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;

/// Inbound webhook payload.
///
/// Serializing an event reproduces the full decoded body: typed fields are
/// skipped when absent and unrecognized fields are preserved verbatim, so
/// downstream consumers see exactly what the webhook source sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Event type used for forwarding decisions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Partner record echoed back in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_partner: Option<Map<String, Value>>,

    /// All other fields, forwarded opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundEvent {
    /// Response body for the webhook caller: a copy of `api_partner` with
    /// the `name` key removed. `None` when the payload carried no partner.
    ///
    /// Operates on a copy so the snapshot handed to the dispatcher is never
    /// aliased by response construction.
    pub fn partner_response(&self) -> Option<Map<String, Value>> {
        self.api_partner.as_ref().map(|partner| {
            let mut response = partner.clone();
            response.remove("name");
            response
        })
    }
}

/// Composite identifier of the publish target.
///
/// Resolved once from immutable configuration; safe to clone into every
/// publisher worker.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    /// Project identifier
    pub project: String,
    /// Cloud region
    pub region: String,
    /// Zone identifier within the region
    pub zone: String,
    /// Topic identifier
    pub topic: String,
}

impl PublishTarget {
    /// Resolve the target from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            project: config.project_id.clone(),
            region: config.cloud_region.clone(),
            zone: config.zone_id.clone(),
            topic: config.topic_id.clone(),
        }
    }

    /// Fully qualified topic path, used as the broker queue name.
    pub fn topic_path(&self) -> String {
        format!(
            "projects/{}/locations/{}-{}/topics/{}",
            self.project, self.region, self.zone, self.topic
        )
    }
}
