//! Notification Sender
//!
//! Outbound user messages (email) sent after successful workflows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Message templates known to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    EmailVerification,
    Welcome,
    PasswordChanged,
    PasswordResetCompleted,
}

impl NotificationTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::EmailVerification => "email_verification",
            NotificationTemplate::Welcome => "welcome",
            NotificationTemplate::PasswordChanged => "password_changed",
            NotificationTemplate::PasswordResetCompleted => "password_reset_completed",
        }
    }
}

impl std::fmt::Display for NotificationTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Port for sending notifications
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        template: NotificationTemplate,
        recipient: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotificationError>;
}

fn validate_recipient(recipient: &str) -> Result<(), NotificationError> {
    let valid = recipient
        .split_once('@')
        .map_or(false, |(local, domain)| !local.is_empty() && domain.contains('.'));

    if valid {
        Ok(())
    } else {
        Err(NotificationError::InvalidRecipient(recipient.to_string()))
    }
}

/// Development sender: logs what would be sent.
///
/// Payload values can carry secrets (verification tokens), so only the
/// payload's field names reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationSender;

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send(
        &self,
        template: NotificationTemplate,
        recipient: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotificationError> {
        validate_recipient(recipient)?;
        tracing::info!(
            template = %template,
            recipient = %recipient,
            payload_fields = %payload_fields(&payload),
            "Notification would send"
        );
        Ok(())
    }
}

fn payload_fields(payload: &serde_json::Value) -> String {
    match payload.as_object() {
        Some(fields) => fields.keys().map(String::as_str).collect::<Vec<_>>().join(","),
        None => String::new(),
    }
}

/// A notification captured by the in-memory sender
#[derive(Debug, Clone, Serialize)]
pub struct SentNotification {
    pub template: NotificationTemplate,
    pub recipient: String,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

/// Records notifications instead of delivering them
#[derive(Debug, Default)]
pub struct InMemoryNotificationSender {
    sent: Mutex<Vec<SentNotification>>,
}

impl InMemoryNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<SentNotification> {
        self.sent
            .lock()
            .iter()
            .filter(|notification| notification.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn send(
        &self,
        template: NotificationTemplate,
        recipient: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotificationError> {
        validate_recipient(recipient)?;
        self.sent.lock().push(SentNotification {
            template,
            recipient: recipient.to_string(),
            payload,
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_recipient() {
        assert!(validate_recipient("alice@example.com").is_ok());
        assert!(validate_recipient("alice").is_err());
        assert!(validate_recipient("@example.com").is_err());
        assert!(validate_recipient("alice@localhost").is_err());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logging_sender_keeps_payload_values_out_of_logs() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(LoggingNotificationSender.send(
                NotificationTemplate::EmailVerification,
                "jane@example.com",
                serde_json::json!({
                    "user_id": "5f0c9a52-0d9e-4d4b-9f0e-3f1b2a7c9d10",
                    "verification_token": "SECRET-TOKEN-123",
                }),
            ))
            .unwrap();
        });

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(output.contains("Notification would send"));
        assert!(output.contains("template=email_verification"));
        assert!(output.contains("verification_token"));
        assert!(!output.contains("SECRET-TOKEN-123"));
    }

    #[test]
    fn test_payload_fields() {
        let payload = serde_json::json!({ "name": "Alice", "token": "abc" });
        assert_eq!(payload_fields(&payload), "name,token");
        assert_eq!(payload_fields(&serde_json::json!(null)), "");
    }

    #[tokio::test]
    async fn test_in_memory_sender_records() {
        let sender = InMemoryNotificationSender::new();
        sender
            .send(
                NotificationTemplate::Welcome,
                "alice@example.com",
                serde_json::json!({ "name": "Alice" }),
            )
            .await
            .unwrap();

        let sent = sender.sent_to("alice@example.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, NotificationTemplate::Welcome);
        assert_eq!(sent[0].payload["name"], "Alice");
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let sender = InMemoryNotificationSender::new();
        let result = sender
            .send(NotificationTemplate::Welcome, "not-an-email", serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(NotificationError::InvalidRecipient(_))));
        assert!(sender.sent().is_empty());
    }
}
