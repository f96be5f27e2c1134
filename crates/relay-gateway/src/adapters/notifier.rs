//! Notifier implementations: chat webhook over HTTP, and a log-only fallback.

use crate::domain::config::NotifyConfig;
use crate::domain::notification::Notification;
use crate::ports::outbound::{Notifier, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Longest error body kept from a failed delivery
const MAX_ERROR_BODY: usize = 512;

/// Posts notifications as a single embed to a chat webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    username: String,
}

impl WebhookNotifier {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| NotifyError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            username: username.into(),
        })
    }

    /// Request body sent to the webhook.
    pub fn payload(&self, notification: &Notification) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = notification
            .fields
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "value": f.value,
                    "inline": f.inline,
                })
            })
            .collect();

        let mut embed = serde_json::json!({
            "title": notification.title,
            "color": notification.color,
            "fields": fields,
            "timestamp": notification.timestamp.to_rfc3339(),
        });
        if let (Some(description), Some(obj)) = (&notification.description, embed.as_object_mut()) {
            obj.insert("description".to_string(), serde_json::json!(description));
        }

        serde_json::json!({
            "username": self.username,
            "embeds": [embed],
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip_all, fields(title = %notification.title))]
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(notification))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Webhook delivered");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        warn!(status = status.as_u16(), "Webhook rejected notification");
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let fields: Vec<String> = notification
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, f.value))
            .collect();
        info!(
            title = %notification.title,
            fields = %fields.join(", "),
            "Notification (no webhook configured)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Pick the notifier for a configuration.
pub fn notifier_from_config(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            config.username.clone(),
            config.timeout,
        )?)),
        None => {
            warn!("No webhook URL configured; notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", "Relay", Duration::from_secs(1)).unwrap();
        let n = Notification::new("Title", 0x123456)
            .description("desc")
            .field("A", "1", true);
        let payload = notifier.payload(&n);
        assert_eq!(payload["username"], "Relay");
        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "Title");
        assert_eq!(embed["description"], "desc");
        assert_eq!(embed["color"], 0x123456);
        assert_eq!(embed["fields"][0]["name"], "A");
        assert_eq!(embed["fields"][0]["inline"], true);
    }

    #[test]
    fn test_payload_omits_missing_description() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", "Relay", Duration::from_secs(1)).unwrap();
        let payload = notifier.payload(&Notification::new("Title", 0));
        assert!(payload["embeds"][0].get("description").is_none());
    }

    #[test]
    fn test_from_config_without_url_logs() {
        let notifier = notifier_from_config(&NotifyConfig::default()).unwrap();
        assert_eq!(notifier.name(), "log");
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send(&Notification::new("t", 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_transport_error() {
        // Grab a free port, then close it so the connection is refused
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let notifier = WebhookNotifier::new(
            format!("http://{}/hook", addr),
            "Relay",
            Duration::from_millis(500),
        )
        .unwrap();
        let result = notifier.send(&Notification::new("t", 0)).await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
