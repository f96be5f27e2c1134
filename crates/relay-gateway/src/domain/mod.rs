//! Domain layer: the admission ledger, the IP access gate, the admin
//! surface over it, and the types they share.

pub mod access;
pub mod admin;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod notification;
pub mod secret;

pub use access::{AccessMode, IpGate, IpPolicy, IpStatus};
pub use admin::{AdminControl, AdminOutcome};
pub use config::RelayConfig;
pub use error::{AccessError, AdmissionError, ApiError, ApiResult, RelayError};
pub use events::{CheckoutEvent, PaymentEvent, WebhookEvent};
pub use ledger::{AdmittedId, TransactionLedger};
pub use notification::Notification;
pub use secret::SharedSecret;
