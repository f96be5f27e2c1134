//! Middleware stack for the relay.
//!
//! Layer order (outermost first): ClientAddr → Tracing → CORS → Timeout →
//! RateLimit → router. Per-route layers: IpGate on the event and metrics
//! routes, ApiKey on checkout and payment.

pub mod auth;
pub mod client_addr;
pub mod cors;
pub mod ip_gate;
pub mod metrics;
pub mod rate_limit;
pub mod timeout;
pub mod tracing;

pub use auth::ApiKeyLayer;
pub use client_addr::{resolve_client_address, ClientAddr, ClientAddrLayer};
pub use cors::create_cors_layer;
pub use ip_gate::IpGateLayer;
pub use metrics::{RelayMetrics, RequestTimer};
pub use rate_limit::{RateLimitLayer, RateLimitState};
pub use timeout::TimeoutLayer;
pub use self::tracing::TracingLayer;
