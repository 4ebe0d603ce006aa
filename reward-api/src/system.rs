use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use reward_core::SERVICE_NAME;
use serde_json::{json, Value};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/credit", put(credit))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": state.version,
        "inFlightPayouts": state.engine.in_flight(),
    }))
}

/// PUT /credit
/// Sink for webhook calls during local runs, logs whatever it receives.
async fn credit(body: Bytes) -> StatusCode {
    tracing::info!(body = %String::from_utf8_lossy(&body), "credit api called");
    StatusCode::OK
}
