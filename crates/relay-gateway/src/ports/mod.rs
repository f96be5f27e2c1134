//! Ports: traits the relay depends on for its side effects.

pub mod outbound;

pub use outbound::{Notifier, NotifyError};
