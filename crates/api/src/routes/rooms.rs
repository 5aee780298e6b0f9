//! Room lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::RoomId;
use rooms::{CompleteRide, Location, NewRoom, RideReceipt, Room};
use serde::{Deserialize, Serialize};

use crate::caller::Caller;
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub capacity: u32,
    pub start_location: Location,
    pub end_location: Location,
    /// Defaults to now.
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct CompleteRideRequest {
    pub total_price: f64,
    #[serde(default)]
    pub distance_km: f64,
}

// -- Response types --

#[derive(Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub creator_id: String,
    pub capacity: u32,
    pub members: Vec<String>,
    pub member_count: usize,
    pub status: String,
    pub start_location: Location,
    pub end_location: Location,
    pub scheduled_time: DateTime<Utc>,
    pub total_price: f64,
    pub cost_per_member: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            member_count: room.member_count(),
            id: room.id.into_inner(),
            creator_id: room.creator_id.into_inner(),
            capacity: room.capacity,
            members: room.members.into_iter().map(|m| m.into_inner()).collect(),
            status: room.status.to_string(),
            start_location: room.start_location,
            end_location: room.end_location,
            scheduled_time: room.scheduled_time,
            total_price: room.total_price,
            cost_per_member: room.cost_per_member,
            created_at: room.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ExitResponse {
    pub success: bool,
}

// -- Handlers --

/// POST /rooms: open a room with the caller as creator.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    JsonBody(req): JsonBody<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let room = state
        .rooms
        .create_room(NewRoom {
            creator_id: user_id,
            capacity: req.capacity,
            start_location: req.start_location,
            end_location: req.end_location,
            scheduled_time: req.scheduled_time.unwrap_or_else(Utc::now),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(room.into())))
}

/// GET /rooms: list rooms that are waiting for members.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RoomResponse>>, ApiError> {
    let rooms = state.rooms.find_rooms().await?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}

/// GET /rooms/{id}: room with its members.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.rooms.room_details(&RoomId::new(id)).await?;
    Ok(Json(room.into()))
}

/// POST /rooms/{id}/join: add the caller to the room.
#[tracing::instrument(skip(state))]
pub async fn join(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.rooms.join_room(&RoomId::new(id), &user_id).await?;
    Ok(Json(room.into()))
}

/// POST /rooms/{id}/exit: remove the caller from the room.
#[tracing::instrument(skip(state))]
pub async fn exit(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    Path(id): Path<String>,
) -> Result<Json<ExitResponse>, ApiError> {
    let success = state.rooms.exit_room(&RoomId::new(id), &user_id).await?;
    Ok(Json(ExitResponse { success }))
}

/// POST /rooms/{id}/complete: finish the ride driven by the caller and bill every member.
#[tracing::instrument(skip(state, req))]
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Caller(driver_id): Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CompleteRideRequest>,
) -> Result<Json<RideReceipt>, ApiError> {
    let receipt = state
        .rooms
        .complete_ride(CompleteRide {
            room_id: RoomId::new(id),
            driver_id,
            total_price: req.total_price,
            distance_km: req.distance_km,
        })
        .await?;

    Ok(Json(receipt))
}
