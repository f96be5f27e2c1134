//! Shared helpers for router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    Router,
};
use parking_lot::Mutex;
use relay_gateway::domain::notification::Notification;
use relay_gateway::{Notifier, NotifyError, RelayConfig, RelayService};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Records every notification; can be switched to fail or to stall.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: AtomicBool,
    pub delay_ms: AtomicU64,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn slow(delay: Duration) -> Self {
        let notifier = Self::default();
        notifier
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        notifier
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Status {
                status: 500,
                body: "upstream down".to_string(),
            });
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.auth.admin_key = Some(ADMIN_KEY.to_string());
    config.rate_limit.enabled = false;
    config
}

pub struct TestRelay {
    pub service: RelayService,
    pub router: Router,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self::with_notifier(config, RecordingNotifier::default())
    }

    pub fn with_notifier(config: RelayConfig, notifier: RecordingNotifier) -> Self {
        let notifier = Arc::new(notifier);
        let service = RelayService::new(config, notifier.clone()).unwrap();
        let router = service.router();
        Self {
            service,
            router,
            notifier,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        split(response).await
    }

    pub async fn post(&self, path: &str, from: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, path, from, &body, &[]))
            .await
    }

    pub async fn admin(&self, path: &str, key: Option<&str>, body: Value) -> (StatusCode, Value) {
        let headers: Vec<(&str, &str)> = key.map(|k| ("x-admin-key", k)).into_iter().collect();
        let method = if path.ends_with("ip-status") {
            Method::GET
        } else {
            Method::POST
        };
        self.send(json_request(method, path, "10.0.0.1", &body, &headers))
            .await
    }
}

pub fn json_request(
    method: Method,
    path: &str,
    from: &str,
    body: &Value,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .header("x-forwarded-for", from);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn split(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
