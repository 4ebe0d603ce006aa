use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use reward_core::{Order, OrderStatus, PayoutError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{error::AppError, state::AppState, webhooks::{parse_callback_url, CALLBACK_URL_HEADER}};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Success bodies are wrapped as `{ "data": ... }`; errors are not.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn json(data: T) -> Json<Self> {
        Json(Self { data })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub sc_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutResponse {
    pub status: OrderStatus,
    pub order_id: Uuid,
}

impl From<Order> for PayoutResponse {
    fn from(order: Order) -> Self {
        Self {
            status: order.status,
            order_id: order.order_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "order-id")]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: OrderStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/r1/payout", post(payout_r1))
        .route("/r2/payout", post(payout_r2))
        // Works for orders created through any route
        .route("/r2/payout/status", get(payout_status))
        .route("/r3/payout", post(payout_r3))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /r1/payout
/// Settles immediately; the response always carries a terminal status.
async fn payout_r1(
    State(state): State<AppState>,
    payload: Result<Json<PayoutRequest>, JsonRejection>,
) -> Result<Json<Envelope<PayoutResponse>>, AppError> {
    let sc_id = scratch_card_id(payload)?;
    let order = state.engine.payout_now(sc_id).await?;
    Ok(Envelope::json(order.into()))
}

/// POST /r2/payout
/// Returns `PENDING`; the order settles in the background.
async fn payout_r2(
    State(state): State<AppState>,
    payload: Result<Json<PayoutRequest>, JsonRejection>,
) -> Result<Json<Envelope<PayoutResponse>>, AppError> {
    let sc_id = scratch_card_id(payload)?;
    let order = state.engine.payout_deferred(sc_id).await?;
    Ok(Envelope::json(order.into()))
}

/// GET /r2/payout/status?order-id=<uuid>
async fn payout_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<Envelope<StatusResponse>>, AppError> {
    let Query(query) = query?;
    let raw = query
        .order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PayoutError::Validation("order-id query parameter is required".into()))?;

    let status = state.engine.get_status_str(&raw).await?;
    Ok(Envelope::json(StatusResponse { status }))
}

/// POST /r3/payout
/// Like r2, and the settled order is PUT to the `x-callback-url` header.
async fn payout_r3(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PayoutRequest>, JsonRejection>,
) -> Result<Json<Envelope<PayoutResponse>>, AppError> {
    let sc_id = scratch_card_id(payload)?;

    let raw_url = headers
        .get(CALLBACK_URL_HEADER)
        .ok_or_else(|| PayoutError::Validation(format!("{} header is required", CALLBACK_URL_HEADER)))?
        .to_str()
        .map_err(|_| PayoutError::Validation(format!("{} must be a valid absolute URL", CALLBACK_URL_HEADER)))?;
    let callback_url = parse_callback_url(raw_url)?;

    let order = state.engine.payout_with_callback(sc_id, callback_url).await?;
    Ok(Envelope::json(order.into()))
}

fn scratch_card_id(payload: Result<Json<PayoutRequest>, JsonRejection>) -> Result<Uuid, AppError> {
    let Json(req) = payload?;
    if req.sc_id.is_nil() {
        return Err(PayoutError::Validation("scId is required".into()).into());
    }
    Ok(req.sc_id)
}
