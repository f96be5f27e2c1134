//! Relay gateway: accepts storefront events (checkout, payment, generic
//! webhook) and relays them as chat notifications.
//!
//! # Architecture
//!
//! ```text
//!  request ──► ClientAddr ─► Tracing ─► CORS ─► Timeout ─► RateLimit
//!                                                              │
//!          ┌───────────────────────────┬───────────────────────┤
//!          ▼                           ▼                       ▼
//!     /api/admin/*                 IpGate                   /health
//!   (X-Admin-Key)           ┌────────┴─────────┐
//!          │                ▼                  ▼
//!          │         ApiKey (X-API-Key)   /api/webhook
//!          │                │              /metrics
//!          ▼                ▼                  │
//!    AdminControl    TransactionLedger         │
//!          │                │                  │
//!          ▼                └──────► Notifier ◄┘
//!       IpGate
//! ```
//!
//! The ledger admits each transaction id at most once for the life of the
//! process. The gate runs in `blacklist` mode (deny listed addresses) or
//! `whitelist` mode (admit listed addresses; an empty allow list admits
//! everyone). All state is in memory.
//!
//! # Usage
//!
//! ```ignore
//! use relay_gateway::{RelayConfig, RelayService};
//!
//! let service = RelayService::from_config(RelayConfig::load()?)?;
//! service.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod service;

pub use adapters::{LogNotifier, WebhookNotifier};
pub use domain::config::RelayConfig;
pub use domain::error::{AccessError, AdmissionError, ApiError, ApiResult, RelayError};
pub use domain::{AccessMode, AdminControl, IpGate, IpStatus, TransactionLedger};
pub use middleware::RelayMetrics;
pub use ports::{Notifier, NotifyError};
pub use service::RelayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
