use crate::handlers::AppState;
use axum::{extract::State, response::IntoResponse, Json};

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "relay-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = state.metrics.to_json(state.ledger.len());
    if let Some(obj) = body.as_object_mut() {
        obj.insert("access_mode".to_string(), serde_json::json!(state.gate.mode()));
    }
    Json(body)
}
