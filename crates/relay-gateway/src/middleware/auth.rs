//! Shared-secret authentication for the event endpoints.
//!
//! The key is read from `X-API-Key` or an `Authorization: Bearer` header and
//! compared in constant time. With no key configured every request passes.

use crate::domain::error::ApiError;
use crate::domain::secret::SharedSecret;
use crate::middleware::client_addr::request_client_addr;
use crate::middleware::metrics::RelayMetrics;
use axum::{
    body::Body,
    http::{HeaderMap, Request},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication layer
#[derive(Clone)]
pub struct ApiKeyLayer {
    secret: Arc<SharedSecret>,
    metrics: Arc<RelayMetrics>,
}

impl ApiKeyLayer {
    pub fn new(secret: SharedSecret, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            secret: Arc::new(secret),
            metrics,
        }
    }
}

impl<S> Layer<S> for ApiKeyLayer {
    type Service = ApiKeyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyService {
            inner,
            secret: Arc::clone(&self.secret),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct ApiKeyService<S> {
    inner: S,
    secret: Arc<SharedSecret>,
    metrics: Arc<RelayMetrics>,
}

impl<S> Service<Request<Body>> for ApiKeyService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let secret = Arc::clone(&self.secret);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !secret.is_configured() {
                debug!("No API key configured, event endpoint open");
                return inner.call(req).await;
            }

            if !secret.verify(presented_key(req.headers())) {
                metrics.record_auth_rejection();
                warn!(
                    ip = %request_client_addr(&req),
                    path = %req.uri().path(),
                    "Rejected request with missing or invalid API key"
                );
                return Ok(ApiError::unauthorized().into_response());
            }

            inner.call(req).await
        })
    }
}

/// Key presented by the caller, if any.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key);
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
