//! Inbound event payloads.
//!
//! Unknown fields are ignored and every known field is read leniently, so a
//! body with a usable `transactionId` is never rejected over display fields.
//! A missing, null or non-string `transactionId` deserializes to `None`,
//! which the ledger treats as empty. Display fields accept numbers and
//! booleans as text; `amount` accepts a number or a numeric string. Any
//! other shape reads as `None`.

use serde::{Deserialize, Deserializer, Serialize};

/// Checkout started on the storefront.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutEvent {
    #[serde(deserialize_with = "string_or_none")]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub product_name: Option<String>,
    #[serde(deserialize_with = "amount_or_none")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "text_or_none")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub customer_email: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub customer_name: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub payment_method: Option<String>,
}

/// Incoming payment detected for an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentEvent {
    #[serde(deserialize_with = "string_or_none")]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "amount_or_none")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "text_or_none")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub network: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub wallet_address: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub tx_hash: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub order_id: Option<String>,
}

/// Free-form webhook relayed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookEvent {
    /// Event name, e.g. `order.refunded`
    #[serde(deserialize_with = "text_or_none")]
    pub event: Option<String>,
    #[serde(deserialize_with = "text_or_none")]
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn amount_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|a| a.is_finite()))
}
