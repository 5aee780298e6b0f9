//! Route history.
//!
//! A best-effort record of completed trips. Writes happen after a ride is
//! completed and never affect the ride's outcome.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{RoomId, RouteId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

pub use memory::InMemoryRouteHistory;
pub use postgres::PostgresRouteHistory;

/// A completed trip to record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoute {
    pub room_id: RoomId,
    pub driver_id: UserId,
    pub start_point: String,
    pub end_point: String,
    pub distance_km: f64,
    pub total_price: f64,
    pub passenger_ids: Vec<UserId>,
}

/// A recorded trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: RouteId,
    pub room_id: RoomId,
    pub driver_id: UserId,
    pub start_point: String,
    pub end_point: String,
    pub distance_km: f64,
    pub total_price: f64,
    pub passenger_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Returns true if the user drove or rode on this trip.
    pub fn involves(&self, user_id: &UserId) -> bool {
        &self.driver_id == user_id || self.passenger_ids.contains(user_id)
    }
}

/// Sink for completed trips.
#[async_trait]
pub trait RouteHistory: Send + Sync {
    /// Records a trip. A room can be recorded only once.
    async fn save_route(&self, route: &NewRoute) -> Result<RouteId, HistoryError>;

    /// Lists the trips a user drove or rode on, newest first.
    async fn routes_for_user(&self, user_id: &UserId) -> Result<Vec<Route>, HistoryError>;
}

#[async_trait]
impl<T: RouteHistory + ?Sized> RouteHistory for Arc<T> {
    async fn save_route(&self, route: &NewRoute) -> Result<RouteId, HistoryError> {
        (**self).save_route(route).await
    }

    async fn routes_for_user(&self, user_id: &UserId) -> Result<Vec<Route>, HistoryError> {
        (**self).routes_for_user(user_id).await
    }
}
