//! Webhook delivery channel.

use super::{Notification, Notifier, NotifyError};

use std::time::Duration;

/// Posts notifications as JSON to a configured webhook URL. Stands in for the
/// mail relay / desktop pop-up transports, which live outside this process.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "subject": notification.subject,
            "body": notification.body,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_webhook_unreachable_is_delivery_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook").unwrap();
        let result = notifier
            .deliver(Notification {
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await;
        assert!(matches!(result, Err(NotifyError::Delivery(_))));
    }
}
