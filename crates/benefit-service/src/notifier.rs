//! Webhook notification of ledger status transitions

use tracing::{debug, warn};

use crate::models::NotificationPayload;

/// Sends fire-and-forget webhook notifications. Delivery failures are
/// logged and never roll back the transition that triggered them.
pub struct Notifier {
    http_client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// Create a new notifier; `None` disables delivery entirely
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Notify the configured webhook of a status transition
    pub async fn notify(&self, payload: &NotificationPayload) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        match self.http_client.post(url).json(payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!(
                        "Notification sent: {} for {}/{}",
                        payload.event, payload.beneficiary_id, payload.ordinal
                    );
                } else {
                    warn!(
                        "Notification webhook returned status {} for {}/{}",
                        response.status(),
                        payload.beneficiary_id,
                        payload.ordinal
                    );
                }
            }
            Err(e) => {
                warn!(
                    "Failed to send notification for {}/{}: {}",
                    payload.beneficiary_id, payload.ordinal, e
                );
            }
        }
    }
}
