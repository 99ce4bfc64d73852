//! Terminal-state notifications
//!
//! The notifier is a capability interface invoked at terminal states only.
//! Delivery is best effort: the orchestrator logs and swallows every send
//! failure, and dedup happens upstream via the activation-notice records.

use async_trait::async_trait;

/// Notification delivery failure, logged and swallowed by callers
#[derive(Debug, thiserror::Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Default notifier: writes the message to the structured log.
///
/// Stands in for the SMTP/SMS transport, which is a deployment concern.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(to = %email, subject = %subject, body = %body, "Notification sent");
        Ok(())
    }
}

/// Test notifier that records every send
#[cfg(test)]
pub struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError("simulated outage".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), subject.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier;
        let result = notifier
            .send("user@example.com", "Offer Activation Successful", "body")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier
            .send("a@example.com", "subject", "body")
            .await
            .unwrap();
        assert_eq!(notifier.count(), 1);

        let failing = RecordingNotifier::failing();
        assert!(failing.send("a@example.com", "s", "b").await.is_err());
        assert_eq!(failing.count(), 0);
    }
}
