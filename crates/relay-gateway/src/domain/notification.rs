//! Chat notifications built from inbound events.
//!
//! The model mirrors a chat "embed": a title, optional description, an accent
//! color and a list of name/value fields. Lengths are clamped to the limits
//! common chat webhooks enforce.

use crate::domain::events::{CheckoutEvent, PaymentEvent, WebhookEvent};
use crate::domain::ledger::AdmittedId;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
pub const MAX_DESCRIPTION_LEN: usize = 2048;

pub const COLOR_CHECKOUT: u32 = 0x3498DB;
pub const COLOR_PAYMENT: u32 = 0x2ECC71;
pub const COLOR_WEBHOOK: u32 = 0x95A5A6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: clamp(title.into(), MAX_TITLE_LEN),
            description: None,
            color,
            fields: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(clamp(text.into(), MAX_DESCRIPTION_LEN));
        self
    }

    /// Append a field. Empty values are skipped.
    pub fn field(mut self, name: &str, value: impl Into<String>, inline: bool) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.push(NotificationField {
                name: name.to_string(),
                value: clamp(value, MAX_FIELD_VALUE_LEN),
                inline,
            });
        }
        self
    }

    fn field_opt(self, name: &str, value: Option<&str>, inline: bool) -> Self {
        match value {
            Some(v) => self.field(name, v, inline),
            None => self,
        }
    }

    pub fn checkout(event: &CheckoutEvent, id: &AdmittedId, client: &str) -> Self {
        Self::new("🛒 Checkout started", COLOR_CHECKOUT)
            .field("Transaction ID", id.as_str(), false)
            .field_opt("Product", event.product_name.as_deref(), true)
            .field(
                "Amount",
                format_amount(event.amount, event.currency.as_deref()),
                true,
            )
            .field_opt("Customer", event.customer_name.as_deref(), true)
            .field_opt("Email", event.customer_email.as_deref(), true)
            .field_opt("Payment method", event.payment_method.as_deref(), true)
            .field("Client IP", client, true)
    }

    pub fn payment(event: &PaymentEvent, id: &AdmittedId, client: &str) -> Self {
        Self::new("💰 Payment detected", COLOR_PAYMENT)
            .field("Transaction ID", id.as_str(), false)
            .field_opt("Order", event.order_id.as_deref(), true)
            .field(
                "Amount",
                format_amount(event.amount, event.currency.as_deref()),
                true,
            )
            .field_opt("Network", event.network.as_deref(), true)
            .field_opt("Wallet", event.wallet_address.as_deref(), false)
            .field_opt("Tx hash", event.tx_hash.as_deref(), false)
            .field("Client IP", client, true)
    }

    pub fn webhook(event: &WebhookEvent, client: &str) -> Self {
        let title = match event.event.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("📨 Webhook: {}", name),
            _ => "📨 Webhook received".to_string(),
        };
        let mut notification = Self::new(title, COLOR_WEBHOOK);
        if let Some(message) = event.message.as_deref().filter(|m| !m.trim().is_empty()) {
            notification = notification.description(message);
        }
        if let Some(data) = &event.data {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            // Leave room for the code fence
            let body = clamp(pretty, MAX_FIELD_VALUE_LEN - 8);
            notification = notification.field("Data", format!("```\n{}\n```", body), false);
        }
        notification.field("Client IP", client, true)
    }
}

/// `49.5, Some("USD")` → `"49.50 USD"`; missing amount → empty string.
pub fn format_amount(amount: Option<f64>, currency: Option<&str>) -> String {
    match (amount, currency.map(str::trim).filter(|c| !c.is_empty())) {
        (Some(a), Some(c)) => format!("{:.2} {}", a, c.to_uppercase()),
        (Some(a), None) => format!("{:.2}", a),
        (None, _) => String::new(),
    }
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
fn clamp(s: String, max: usize) -> String {
    if s.chars().count() <= max {
        return s;
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
