//! Outbound ports for the relay.

use crate::domain::notification::Notification;
use async_trait::async_trait;

/// Delivery failures. None of these are retried by the relay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Client could not be built
    #[error("notifier setup failed: {0}")]
    Setup(String),
    /// Connection, TLS or timeout failure
    #[error("webhook request failed: {0}")]
    Transport(String),
    /// Webhook answered with a non-success status
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Destination for relayed event notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
