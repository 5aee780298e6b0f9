use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{RouteId, UserId};
use tokio::sync::RwLock;

use super::{NewRoute, Route, RouteHistory};
use crate::error::HistoryError;

#[derive(Debug, Default)]
struct HistoryState {
    routes: Vec<Route>,
    fail_on_save: bool,
}

/// In-memory route history.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRouteHistory {
    state: Arc<RwLock<HistoryState>>,
}

impl InMemoryRouteHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent saves fail.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }

    /// Returns the number of recorded routes.
    pub async fn route_count(&self) -> usize {
        self.state.read().await.routes.len()
    }

    /// Returns every recorded route in insertion order.
    pub async fn all_routes(&self) -> Vec<Route> {
        self.state.read().await.routes.clone()
    }
}

#[async_trait]
impl RouteHistory for InMemoryRouteHistory {
    async fn save_route(&self, route: &NewRoute) -> Result<RouteId, HistoryError> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(HistoryError::Unavailable("save rejected".to_string()));
        }
        if state.routes.iter().any(|r| r.room_id == route.room_id) {
            return Err(HistoryError::AlreadyRecorded(route.room_id.clone()));
        }

        let route_id = RouteId::generate();
        state.routes.push(Route {
            route_id: route_id.clone(),
            room_id: route.room_id.clone(),
            driver_id: route.driver_id.clone(),
            start_point: route.start_point.clone(),
            end_point: route.end_point.clone(),
            distance_km: route.distance_km,
            total_price: route.total_price,
            passenger_ids: route.passenger_ids.clone(),
            created_at: Utc::now(),
        });
        Ok(route_id)
    }

    async fn routes_for_user(&self, user_id: &UserId) -> Result<Vec<Route>, HistoryError> {
        let state = self.state.read().await;
        let mut routes: Vec<_> = state
            .routes
            .iter()
            .rev()
            .filter(|r| r.involves(user_id))
            .cloned()
            .collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes)
    }
}
