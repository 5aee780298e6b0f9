//! Settlement endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{PaymentId, RoomId};
use payments::{PaymentDetails, PaymentRecord, ProcessPayment, Settled, Settlement};
use serde::{Deserialize, Serialize};

use crate::caller::Caller;
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RefundRequest {
    pub room_id: String,
    /// Defaults to "Ride cancelled".
    #[serde(default)]
    pub reason: String,
}

#[derive(Serialize)]
pub struct RefundResponse {
    pub refunded: Vec<PaymentRecord>,
    pub success: bool,
}

/// POST /payments/process: charge every listed participant.
#[tracing::instrument(skip(state, req), fields(room_id = %req.room_id))]
pub async fn process(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ProcessPayment>,
) -> Result<Json<Settled>, ApiError> {
    Ok(Json(state.payments.process_payment(req).await?))
}

/// POST /payments/refund: refund every succeeded payment of a room.
#[tracing::instrument(skip(state, req), fields(room_id = %req.room_id))]
pub async fn refund(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refunded = state
        .payments
        .refund_payment(&RoomId::new(req.room_id), &req.reason)
        .await?;

    Ok(Json(RefundResponse {
        refunded,
        success: true,
    }))
}

/// GET /payments/history: the caller's payments, newest first.
#[tracing::instrument(skip(state))]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    Ok(Json(state.payments.payment_history(&user_id).await?))
}

/// GET /payments/{id}: a ledger record with the provider's current view.
#[tracing::instrument(skip(state))]
pub async fn details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentDetails>, ApiError> {
    Ok(Json(
        state.payments.payment_details(&PaymentId::new(id)).await?,
    ))
}
