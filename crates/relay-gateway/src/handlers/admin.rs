//! Admin endpoints over the IP gate, authorized by `X-Admin-Key`.
//!
//! Bodies are read leniently: a missing or malformed body is an empty
//! address or mode, so the key is always checked before body errors surface.
//! An oversized body is reported as 413, but only to an authorized caller.

use crate::domain::access::IpStatus;
use crate::domain::error::{AccessError, ApiResult};
use crate::handlers::{Ack, AppState};
use axum::{
    body::Bytes, extract::rejection::BytesRejection, extract::State, http::HeaderMap, Json,
};
use serde::{Deserialize, Serialize};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IpRequest {
    pub ip: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModeRequest {
    pub mode: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: IpStatus,
}

fn admin_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok())
}

fn lenient<T: for<'de> Deserialize<'de> + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

fn read_body<T: for<'de> Deserialize<'de> + Default>(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<T> {
    match body {
        Ok(body) => Ok(lenient(&body)),
        Err(_) if !state.admin.authorize(admin_key(headers)) => {
            Err(AccessError::Unauthorized.into())
        }
        Err(rejection) => Err(rejection.into()),
    }
}

pub async fn ip_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.admin.status(admin_key(&headers))?;
    Ok(Json(StatusResponse {
        success: true,
        status,
    }))
}

pub async fn block_ip(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<IpStatus>>> {
    let req: IpRequest = read_body(&state, &headers, body)?;
    let outcome = state.admin.block(admin_key(&headers), &req.ip)?;
    Ok(Json(Ack::new(outcome.message, outcome.status)))
}

pub async fn allow_ip(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<IpStatus>>> {
    let req: IpRequest = read_body(&state, &headers, body)?;
    let outcome = state.admin.allow(admin_key(&headers), &req.ip)?;
    Ok(Json(Ack::new(outcome.message, outcome.status)))
}

pub async fn remove_ip(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<IpStatus>>> {
    let req: IpRequest = read_body(&state, &headers, body)?;
    let outcome = state.admin.remove(admin_key(&headers), &req.ip)?;
    Ok(Json(Ack::new(outcome.message, outcome.status)))
}

pub async fn ip_mode(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Ack<IpStatus>>> {
    let req: ModeRequest = read_body(&state, &headers, body)?;
    let outcome = state.admin.set_mode(admin_key(&headers), &req.mode)?;
    Ok(Json(Ack::new(outcome.message, outcome.status)))
}
