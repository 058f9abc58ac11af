//! Transition notifiers
//!
//! A notifier is told about every committed transition. Calls must return
//! immediately: anything slow runs on a spawned task and its failures are
//! only logged.

use super::bus::EventBus;
use super::types::FlowEvent;
use crate::conversation::TransitionRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sink for committed transitions
pub trait Notifier: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Deliver a record without blocking the caller
    fn notify(&self, record: &TransitionRecord);
}

/// Shared notifier handle
pub type SharedNotifier = Arc<dyn Notifier>;

impl Notifier for EventBus {
    fn name(&self) -> &str {
        "event_bus"
    }

    fn notify(&self, record: &TransitionRecord) {
        self.publish(FlowEvent::TransitionApplied {
            record: record.clone(),
        });
    }
}

/// Webhook settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving a JSON POST per transition
    pub url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_webhook_timeout_ms() -> u64 {
    5_000
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    record: &'a TransitionRecord,
}

/// Posts each transition to an HTTP endpoint (alerts, CRM sync)
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier for `config.url`
    pub fn new(config: &WebhookConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Target URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn notify(&self, record: &TransitionRecord) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(url = %self.url, "No async runtime, webhook notification dropped");
            return;
        };

        let body = match serde_json::to_value(WebhookPayload {
            event: "transition_applied",
            record,
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode webhook payload");
                return;
            }
        };

        let client = self.client.clone();
        let url = self.url.clone();
        let conversation_id = record.conversation_id.clone();
        handle.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%url, %conversation_id, "Webhook delivered");
                }
                Ok(response) => {
                    warn!(%url, %conversation_id, status = %response.status(), "Webhook rejected");
                }
                Err(e) => {
                    warn!(%url, %conversation_id, error = %e, "Webhook delivery failed");
                }
            }
        });
    }
}
