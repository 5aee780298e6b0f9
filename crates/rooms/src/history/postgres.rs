use async_trait::async_trait;
use chrono::Utc;
use common::{RoomId, RouteId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{NewRoute, Route, RouteHistory};
use crate::error::HistoryError;

/// PostgreSQL-backed route history.
#[derive(Clone)]
pub struct PostgresRouteHistory {
    pool: PgPool,
}

impl PostgresRouteHistory {
    /// Creates a history over an existing pool. The route tables must exist.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_route(row: PgRow) -> Result<Route, HistoryError> {
        let passengers: Vec<String> = row.try_get("passenger_ids")?;
        Ok(Route {
            route_id: RouteId::new(row.try_get::<String, _>("route_id")?),
            room_id: RoomId::new(row.try_get::<String, _>("room_id")?),
            driver_id: UserId::new(row.try_get::<String, _>("driver_id")?),
            start_point: row.try_get("start_point")?,
            end_point: row.try_get("end_point")?,
            distance_km: row.try_get("distance")?,
            total_price: row.try_get("total_price")?,
            passenger_ids: passengers.into_iter().map(UserId::new).collect(),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl RouteHistory for PostgresRouteHistory {
    async fn save_route(&self, route: &NewRoute) -> Result<RouteId, HistoryError> {
        let route_id = RouteId::generate();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO routes (route_id, room_id, driver_id, start_point, end_point,
                                distance, total_price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(route_id.as_str())
        .bind(route.room_id.as_str())
        .bind(route.driver_id.as_str())
        .bind(&route.start_point)
        .bind(&route.end_point)
        .bind(route.distance_km)
        .bind(route.total_price)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            return Err(if duplicate {
                HistoryError::AlreadyRecorded(route.room_id.clone())
            } else {
                HistoryError::Database(e)
            });
        }

        for (position, passenger) in (0_i32..).zip(&route.passenger_ids) {
            sqlx::query(
                r#"
                INSERT INTO route_passengers (route_id, user_id, position)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(route_id.as_str())
            .bind(passenger.as_str())
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(route_id)
    }

    async fn routes_for_user(&self, user_id: &UserId) -> Result<Vec<Route>, HistoryError> {
        let rows = sqlx::query(
            r#"
            SELECT r.route_id, r.room_id, r.driver_id, r.start_point, r.end_point,
                   r.distance, r.total_price, r.created_at,
                   ARRAY(
                       SELECT p.user_id::TEXT FROM route_passengers p
                       WHERE p.route_id = r.route_id
                       ORDER BY p.position
                   ) AS passenger_ids
            FROM routes r
            WHERE r.driver_id = $1
               OR EXISTS (
                   SELECT 1 FROM route_passengers p
                   WHERE p.route_id = r.route_id AND p.user_id = $1
               )
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_route).collect()
    }
}
