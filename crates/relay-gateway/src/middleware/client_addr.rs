//! Client address resolution.
//!
//! Precedence: first `X-Forwarded-For` entry, then `X-Real-IP`, then the
//! transport peer address, then the literal `"Unknown"`. Proxy headers are
//! trusted as sent; anything in front of the relay must overwrite them.

use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap, Request},
    response::Response,
};
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tower::{Layer, Service};

pub const UNKNOWN_ADDR: &str = "Unknown";

/// Resolved client address, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientAddr(pub String);

impl ClientAddr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the client address from headers and the optional peer address.
pub fn resolve_client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientAddr {
    // X-Forwarded-For: client, proxy1, proxy2
    if let Some(first) = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return ClientAddr(first.to_string());
    }

    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return ClientAddr(real_ip.to_string());
    }

    match peer {
        Some(addr) => ClientAddr(addr.ip().to_canonical().to_string()),
        None => ClientAddr(UNKNOWN_ADDR.to_string()),
    }
}

fn resolve_from(headers: &HeaderMap, extensions: &Extensions) -> ClientAddr {
    if let Some(addr) = extensions.get::<ClientAddr>() {
        return addr.clone();
    }
    let peer = extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0);
    resolve_client_address(headers, peer)
}

/// Address already resolved for this request, or resolve it now.
pub fn request_client_addr<B>(req: &Request<B>) -> ClientAddr {
    resolve_from(req.headers(), req.extensions())
}

/// Transport peer of the connection, ignoring any proxy headers.
pub fn request_peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_canonical())
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(resolve_from(&parts.headers, &parts.extensions))
    }
}

/// Layer that resolves the client address once and stores it for the
/// layers and handlers below.
#[derive(Clone, Default)]
pub struct ClientAddrLayer;

impl ClientAddrLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ClientAddrLayer {
    type Service = ClientAddrService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientAddrService { inner }
    }
}

#[derive(Clone)]
pub struct ClientAddrService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for ClientAddrService<S>
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
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            let addr = resolve_from(&parts.headers, &parts.extensions);
            parts.extensions.insert(addr);
            inner.call(Request::from_parts(parts, body)).await
        })
    }
}
