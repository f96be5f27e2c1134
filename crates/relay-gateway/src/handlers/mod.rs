//! HTTP handlers.

pub mod admin;
pub mod events;
pub mod system;

use crate::domain::{AdminControl, IpGate, TransactionLedger};
use crate::middleware::RelayMetrics;
use crate::ports::Notifier;
use serde::Serialize;
use std::sync::Arc;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<TransactionLedger>,
    pub gate: Arc<IpGate>,
    pub admin: Arc<AdminControl>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<RelayMetrics>,
}

/// Success envelope: `{ success: true, message, ...payload }`
#[derive(Debug, Serialize)]
pub struct Ack<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> Ack<T> {
    pub fn new(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload,
        }
    }
}
