//! Event endpoints: checkout, payment and the generic webhook.
//!
//! Checkout and payment consume their transaction id before anything is
//! sent. A failed delivery does not give the id back.

use crate::domain::error::{ApiError, ApiResult};
use crate::domain::events::{CheckoutEvent, PaymentEvent, WebhookEvent};
use crate::domain::ledger::AdmittedId;
use crate::domain::notification::Notification;
use crate::handlers::{Ack, AppState};
use crate::middleware::ClientAddr;
use axum::{body::Bytes, extract::rejection::BytesRejection, extract::State, Json};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, instrument, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relayed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<AdmittedId>,
}

/// Oversized bodies surface as 413 and unreadable ones as 400, both in the
/// usual error envelope.
fn parse_body<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> ApiResult<T> {
    let body = body?;
    serde_json::from_slice(&body).map_err(ApiError::from)
}

fn admit(state: &AppState, raw: Option<&str>, client: &ClientAddr) -> ApiResult<AdmittedId> {
    match state.ledger.validate_and_admit(raw.unwrap_or_default()) {
        Ok(id) => {
            state.metrics.record_admission(true);
            Ok(id)
        }
        Err(e) => {
            state.metrics.record_admission(false);
            warn!(ip = %client, code = e.code(), "Transaction id rejected");
            Err(e.into())
        }
    }
}

async fn deliver(state: &AppState, notification: &Notification) -> ApiResult<()> {
    match state.notifier.send(notification).await {
        Ok(()) => {
            state.metrics.record_notification(true);
            Ok(())
        }
        Err(e) => {
            state.metrics.record_notification(false);
            warn!(
                notifier = state.notifier.name(),
                error = %e,
                "Notification delivery failed"
            );
            Err(e.into())
        }
    }
}

#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<Relayed>>> {
    let event: CheckoutEvent = parse_body(body)?;
    let id = admit(&state, event.transaction_id.as_deref(), &client)?;

    deliver(&state, &Notification::checkout(&event, &id, client.as_str())).await?;
    info!(transaction_id = %id, ip = %client, "Checkout relayed");

    Ok(Json(Ack::new(
        "Checkout notification sent",
        Relayed {
            transaction_id: Some(id),
        },
    )))
}

#[instrument(skip_all)]
pub async fn payment(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<Relayed>>> {
    let event: PaymentEvent = parse_body(body)?;
    let id = admit(&state, event.transaction_id.as_deref(), &client)?;

    deliver(&state, &Notification::payment(&event, &id, client.as_str())).await?;
    info!(transaction_id = %id, ip = %client, "Payment relayed");

    Ok(Json(Ack::new(
        "Payment notification sent",
        Relayed {
            transaction_id: Some(id),
        },
    )))
}

#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<Relayed>>> {
    let event: WebhookEvent = parse_body(body)?;

    deliver(&state, &Notification::webhook(&event, client.as_str())).await?;
    info!(event = event.event.as_deref().unwrap_or("-"), ip = %client, "Webhook relayed");

    Ok(Json(Ack::new(
        "Webhook relayed",
        Relayed {
            transaction_id: None,
        },
    )))
}
