//! Route history endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use rooms::Route;

use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /routes/history: trips the caller drove or rode on, newest first.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<Route>>, ApiError> {
    Ok(Json(state.rooms.user_routes(&user_id).await?))
}
