//! Per-client rate limiting with token buckets.
//!
//! Each resolved client address gets two buckets: a general one and a
//! stricter one for the endpoints that consume transaction ids.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::ApiError;
use crate::middleware::client_addr::{request_client_addr, request_peer_ip};
use crate::middleware::metrics::RelayMetrics;
use axum::{
    body::Body,
    http::{Method, Request},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Paths whose POSTs draw from the write bucket
const WRITE_PATHS: &[&str] = &["/api/checkout", "/api/payment"];

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

/// Token buckets for one client address
struct TokenBucket {
    read_limiter: DirectLimiter,
    write_limiter: DirectLimiter,
    /// Last access time (for cleanup)
    last_access: Instant,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        let read_quota = Quota::per_second(non_zero(config.requests_per_second))
            .allow_burst(non_zero(config.burst_size));
        let write_quota = Quota::per_second(non_zero(config.writes_per_second))
            .allow_burst(non_zero(config.writes_per_second.max(config.burst_size / 10)));

        Self {
            read_limiter: RateLimiter::direct(read_quota),
            write_limiter: RateLimiter::direct(write_quota),
            last_access: Instant::now(),
        }
    }

    fn check(&mut self, is_write: bool) -> Result<(), Duration> {
        self.last_access = Instant::now();
        let limiter = if is_write {
            &self.write_limiter
        } else {
            &self.read_limiter
        };
        limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

/// Rate limiter state shared across requests
pub struct RateLimitState {
    buckets: DashMap<String, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Check whether a request from `addr` may proceed; on refusal returns
    /// how long until a token is available.
    ///
    /// Buckets are keyed by the resolved address. Exemption is decided on
    /// the transport `peer` only, so a forwarded header cannot claim it.
    pub fn check(&self, addr: &str, peer: Option<IpAddr>, is_write: bool) -> Result<(), Duration> {
        if !self.config.enabled || peer.is_some_and(|ip| self.is_exempt(ip)) {
            return Ok(());
        }

        let mut bucket = self.buckets.entry(addr.to_string()).or_insert_with(|| {
            debug!(ip = addr, "Creating new rate limit bucket");
            TokenBucket::new(&self.config)
        });
        bucket.check(is_write)
    }

    fn is_exempt(&self, peer: IpAddr) -> bool {
        self.config
            .exempt
            .iter()
            .filter_map(|e| e.trim().parse::<IpAddr>().ok())
            .any(|e| e.to_canonical() == peer)
    }

    /// Drop buckets idle for longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets.retain(|addr, bucket| {
            let age = now.duration_since(bucket.last_access);
            if age > max_age {
                debug!(ip = %addr, age_secs = age.as_secs(), "Removing stale rate limit bucket");
                false
            } else {
                true
            }
        });
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.config.idle_timeout
    }
}

pub fn is_write_request<B>(req: &Request<B>) -> bool {
    req.method() == Method::POST && WRITE_PATHS.contains(&req.uri().path())
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
    metrics: Arc<RelayMetrics>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(config)),
            metrics,
        }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
    metrics: Arc<RelayMetrics>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let state = Arc::clone(&self.state);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let addr = request_client_addr(&req);
            let peer = request_peer_ip(&req);
            let is_write = is_write_request(&req);

            match state.check(addr.as_str(), peer, is_write) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    let retry_ms = retry_after.as_millis() as u64;
                    metrics.record_rate_limit_rejection();
                    warn!(
                        ip = %addr,
                        retry_after_ms = retry_ms,
                        is_write = is_write,
                        "Rate limit exceeded"
                    );
                    Ok(ApiError::rate_limited(retry_ms).into_response())
                }
            }
        })
    }
}

/// Background task to clean up stale rate limit buckets
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup(state.idle_timeout());
    }
}
