//! Adapters for the relay.
//!
//! Infrastructure implementations of the ports, plus HTTP error conversions.

pub mod error_conversions;
pub mod notifier;

pub use notifier::{notifier_from_config, LogNotifier, WebhookNotifier};
