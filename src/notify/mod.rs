//! Notification dispatch.
//!
//! The coordinator decides *whether* to notify; delivery runs on its own task
//! behind a queue so a slow or failing channel can never stall ingestion.
//! Delivery transports (tray pop-up, mail relay) are collaborators behind the
//! [`Notifier`] trait.

mod webhook;

pub use webhook::WebhookNotifier;

use thiserror::Error;
use tokio::sync::mpsc;

/// One outbound notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Notification delivery errors. Logged by the dispatcher, never retried,
/// never surfaced to the ingestion path.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A delivery channel for notifications.
pub trait Notifier: Send + Sync + 'static {
    fn deliver(
        &self,
        notification: Notification,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Logs notifications instead of delivering them anywhere. The default
/// channel when no webhook is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!("NOTIFY [{}] {}", notification.subject, notification.body);
        Ok(())
    }
}

/// Fire-and-forget dispatcher.
///
/// Dispatch never blocks: a full queue drops the notification with a warning.
/// In-flight deliveries are abandoned on shutdown.
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    const QUEUE_DEPTH: usize = 64;

    /// Spawn the delivery task draining the queue through `notifier`.
    pub fn spawn<N: Notifier>(notifier: N) -> Self {
        let (tx, rx) = mpsc::channel(Self::QUEUE_DEPTH);
        tokio::spawn(run_delivery_loop(rx, notifier));
        Self { tx }
    }

    /// Queue a notification without waiting.
    pub fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            tracing::warn!("Dropping notification, queue unavailable: {}", e);
        }
    }
}

async fn run_delivery_loop<N: Notifier>(mut rx: mpsc::Receiver<Notification>, notifier: N) {
    while let Some(notification) = rx.recv().await {
        let subject = notification.subject.clone();
        if let Err(e) = notifier.deliver(notification).await {
            tracing::error!("Notification delivery failed for '{}': {}", subject, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct RecordingNotifier {
        delivered: Arc<Mutex<Vec<Notification>>>,
    }

    impl Notifier for RecordingNotifier {
        async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
            self.delivered.lock().unwrap().push(notification);
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        async fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("relay unreachable".to_string()))
        }
    }

    fn notification(subject: &str) -> Notification {
        Notification {
            subject: subject.to_string(),
            body: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = NotificationDispatcher::spawn(RecordingNotifier {
            delivered: delivered.clone(),
        });

        dispatcher.dispatch(notification("A Alarm"));
        dispatcher.dispatch(notification("Sensor Fault"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].subject, "A Alarm");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let dispatcher = NotificationDispatcher::spawn(FailingNotifier);
        // Must not panic or propagate anything
        dispatcher.dispatch(notification("A Alarm"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.dispatch(notification("A Alarm"));
    }

    #[tokio::test]
    async fn test_dispatch_never_blocks() {
        // A notifier that never completes, backing the queue up
        struct StuckNotifier;
        impl Notifier for StuckNotifier {
            async fn deliver(&self, _n: Notification) -> Result<(), NotifyError> {
                std::future::pending().await
            }
        }

        let dispatcher = NotificationDispatcher::spawn(StuckNotifier);
        let start = std::time::Instant::now();
        for i in 0..(NotificationDispatcher::QUEUE_DEPTH + 10) {
            dispatcher.dispatch(notification(&format!("n{}", i)));
        }
        // Overflow is dropped, not waited on
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
