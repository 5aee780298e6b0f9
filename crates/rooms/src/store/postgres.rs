use async_trait::async_trait;
use chrono::Utc;
use common::{RoomId, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use super::RoomStore;
use crate::error::RoomStoreError;
use crate::room::{Location, Room, RoomStatus};

const SELECT_ROOMS: &str = r#"
    SELECT r.room_id, r.creator_id,
           r.start_latitude, r.start_longitude, r.start_address,
           r.end_latitude, r.end_longitude, r.end_address,
           r.available_seats, r.status, r.total_price, r.cost_per_member,
           r.scheduled_time, r.created_at,
           ARRAY(
               SELECT m.user_id::TEXT FROM room_members m
               WHERE m.room_id = r.room_id
               ORDER BY m.joined_at, m.user_id
           ) AS members
    FROM rooms r
"#;

/// PostgreSQL-backed room store.
///
/// Joins lock the room row (`SELECT ... FOR UPDATE`) before counting
/// members, so concurrent joins to the same room are serialized.
#[derive(Clone)]
pub struct PostgresRoomStore {
    pool: PgPool,
}

impl PostgresRoomStore {
    /// Creates a store over an existing pool. The room tables must exist.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_room(row: PgRow) -> Result<Room, RoomStoreError> {
        let status: String = row.try_get("status")?;
        let seats: i32 = row.try_get("available_seats")?;
        let members: Vec<String> = row.try_get("members")?;

        Ok(Room {
            id: RoomId::new(row.try_get::<String, _>("room_id")?),
            creator_id: UserId::new(row.try_get::<String, _>("creator_id")?),
            capacity: u32::try_from(seats)
                .map_err(|_| RoomStoreError::Unavailable(format!("invalid capacity {seats}")))?,
            members: members.into_iter().map(UserId::new).collect(),
            status: status.parse()?,
            start_location: Location {
                latitude: row.try_get("start_latitude")?,
                longitude: row.try_get("start_longitude")?,
                address: row.try_get("start_address")?,
            },
            end_location: Location {
                latitude: row.try_get("end_latitude")?,
                longitude: row.try_get("end_longitude")?,
                address: row.try_get("end_address")?,
            },
            scheduled_time: row.try_get("scheduled_time")?,
            total_price: row.try_get("total_price")?,
            cost_per_member: row.try_get("cost_per_member")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn insert_member(
        tx: &mut Transaction<'_, Postgres>,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<(), RoomStoreError> {
        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Explains why a guarded update touched no rows.
    async fn missing_or_completed(&self, room_id: &RoomId) -> RoomStoreError {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM rooms WHERE room_id = $1)",
        )
        .bind(room_id.as_str())
        .fetch_one(&self.pool)
        .await;

        match exists {
            Ok(true) => RoomStoreError::AlreadyCompleted(room_id.clone()),
            Ok(false) => RoomStoreError::RoomNotFound(room_id.clone()),
            Err(e) => RoomStoreError::Database(e),
        }
    }
}

#[async_trait]
impl RoomStore for PostgresRoomStore {
    async fn create_room(&self, room: &Room) -> Result<(), RoomStoreError> {
        let seats = i32::try_from(room.capacity).map_err(|_| {
            RoomStoreError::Unavailable(format!("capacity {} out of range", room.capacity))
        })?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO rooms (room_id, creator_id,
                               start_latitude, start_longitude, start_address,
                               end_latitude, end_longitude, end_address,
                               available_seats, status, total_price, cost_per_member,
                               scheduled_time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(room.id.as_str())
        .bind(room.creator_id.as_str())
        .bind(room.start_location.latitude)
        .bind(room.start_location.longitude)
        .bind(&room.start_location.address)
        .bind(room.end_location.latitude)
        .bind(room.end_location.longitude)
        .bind(&room.end_location.address)
        .bind(seats)
        .bind(room.status.as_str())
        .bind(room.total_price)
        .bind(room.cost_per_member)
        .bind(room.scheduled_time)
        .bind(room.created_at)
        .execute(&mut *tx)
        .await?;

        for member in &room.members {
            Self::insert_member(&mut tx, &room.id, member).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), RoomStoreError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(i32, String)> = sqlx::query_as(
            "SELECT available_seats, status FROM rooms WHERE room_id = $1 FOR UPDATE",
        )
        .bind(room_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let (seats, status) =
            locked.ok_or_else(|| RoomStoreError::RoomNotFound(room_id.clone()))?;
        if status.parse::<RoomStatus>()?.is_terminal() {
            return Err(RoomStoreError::AlreadyCompleted(room_id.clone()));
        }

        let already_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if already_member {
            tx.commit().await?;
            return Ok(());
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM room_members WHERE room_id = $1")
            .bind(room_id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        if count >= i64::from(seats) {
            return Err(RoomStoreError::CapacityExceeded(room_id.clone()));
        }

        Self::insert_member(&mut tx, room_id, user_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<(), RoomStoreError> {
        sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(room_id.as_str())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn room_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, RoomStoreError> {
        let sql = format!("{SELECT_ROOMS} WHERE r.room_id = $1");
        let row = sqlx::query(&sql)
            .bind(room_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_room).transpose()
    }

    async fn list_available_rooms(&self) -> Result<Vec<Room>, RoomStoreError> {
        let sql = format!("{SELECT_ROOMS} WHERE r.status = $1 ORDER BY r.created_at, r.room_id");
        let rows = sqlx::query(&sql)
            .bind(RoomStatus::Waiting.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_room).collect()
    }

    async fn update_room_status(
        &self,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<(), RoomStoreError> {
        let result = sqlx::query("UPDATE rooms SET status = $1 WHERE room_id = $2 AND status <> $3")
            .bind(status.as_str())
            .bind(room_id.as_str())
            .bind(RoomStatus::Completed.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_completed(room_id).await);
        }
        Ok(())
    }

    async fn room_members(&self, room_id: &RoomId) -> Result<Vec<UserId>, RoomStoreError> {
        let members: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM room_members WHERE room_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(members.into_iter().map(UserId::new).collect())
    }

    async fn complete_room(
        &self,
        room_id: &RoomId,
        total_price: f64,
        cost_per_member: f64,
    ) -> Result<(), RoomStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE rooms
            SET status = $1, total_price = $2, cost_per_member = $3
            WHERE room_id = $4 AND status <> $1
            "#,
        )
        .bind(RoomStatus::Completed.as_str())
        .bind(total_price)
        .bind(cost_per_member)
        .bind(room_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_completed(room_id).await);
        }
        Ok(())
    }
}
