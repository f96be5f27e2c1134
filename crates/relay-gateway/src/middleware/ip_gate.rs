//! IP access gate middleware. Denied addresses get a 403 echoing the address.

use crate::domain::access::IpGate;
use crate::domain::error::ApiError;
use crate::middleware::client_addr::request_client_addr;
use crate::middleware::metrics::RelayMetrics;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

#[derive(Clone)]
pub struct IpGateLayer {
    gate: Arc<IpGate>,
    metrics: Arc<RelayMetrics>,
}

impl IpGateLayer {
    pub fn new(gate: Arc<IpGate>, metrics: Arc<RelayMetrics>) -> Self {
        Self { gate, metrics }
    }
}

impl<S> Layer<S> for IpGateLayer {
    type Service = IpGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpGateService {
            inner,
            gate: Arc::clone(&self.gate),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Clone)]
pub struct IpGateService<S> {
    inner: S,
    gate: Arc<IpGate>,
    metrics: Arc<RelayMetrics>,
}

impl<S> Service<Request<Body>> for IpGateService<S>
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
        let gate = Arc::clone(&self.gate);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let addr = request_client_addr(&req);

            if let Err(e) = gate.check(addr.as_str()) {
                metrics.record_gate_denial();
                warn!(
                    ip = %addr,
                    mode = %gate.mode(),
                    path = %req.uri().path(),
                    "Request denied by IP gate"
                );
                return Ok(ApiError::from(e).into_response());
            }

            inner.call(req).await
        })
    }
}
