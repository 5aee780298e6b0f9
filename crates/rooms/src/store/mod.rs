//! Room store.
//!
//! The store is the only owner of room rows and memberships. It enforces the
//! seat capacity itself, so that two racing joins cannot both take the last
//! seat.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use common::{RoomId, UserId};

use crate::error::RoomStoreError;
use crate::room::{Room, RoomStatus};

pub use memory::InMemoryRoomStore;
pub use postgres::PostgresRoomStore;

/// Persistence operations for rooms and their members.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Persists a new room together with its initial members.
    async fn create_room(&self, room: &Room) -> Result<(), RoomStoreError>;

    /// Adds a member. Adding an existing member is a no-op.
    ///
    /// Fails with [`RoomStoreError::CapacityExceeded`] if every seat is taken.
    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), RoomStoreError>;

    /// Removes a member. Removing a non-member is a no-op.
    async fn remove_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<(), RoomStoreError>;

    /// Loads a room with its members.
    async fn room_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, RoomStoreError>;

    /// Lists rooms that are still waiting for members, oldest first.
    async fn list_available_rooms(&self) -> Result<Vec<Room>, RoomStoreError>;

    /// Changes the status of a room that is not completed.
    async fn update_room_status(
        &self,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<(), RoomStoreError>;

    /// Returns the members of a room in join order.
    async fn room_members(&self, room_id: &RoomId) -> Result<Vec<UserId>, RoomStoreError>;

    /// Marks a room completed and stores its fare split.
    ///
    /// Fails with [`RoomStoreError::AlreadyCompleted`] if the room was
    /// completed before.
    async fn complete_room(
        &self,
        room_id: &RoomId,
        total_price: f64,
        cost_per_member: f64,
    ) -> Result<(), RoomStoreError>;
}

#[async_trait]
impl<T: RoomStore + ?Sized> RoomStore for Arc<T> {
    async fn create_room(&self, room: &Room) -> Result<(), RoomStoreError> {
        (**self).create_room(room).await
    }

    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), RoomStoreError> {
        (**self).add_member(room_id, user_id).await
    }

    async fn remove_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<(), RoomStoreError> {
        (**self).remove_member(room_id, user_id).await
    }

    async fn room_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, RoomStoreError> {
        (**self).room_by_id(room_id).await
    }

    async fn list_available_rooms(&self) -> Result<Vec<Room>, RoomStoreError> {
        (**self).list_available_rooms().await
    }

    async fn update_room_status(
        &self,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<(), RoomStoreError> {
        (**self).update_room_status(room_id, status).await
    }

    async fn room_members(&self, room_id: &RoomId) -> Result<Vec<UserId>, RoomStoreError> {
        (**self).room_members(room_id).await
    }

    async fn complete_room(
        &self,
        room_id: &RoomId,
        total_price: f64,
        cost_per_member: f64,
    ) -> Result<(), RoomStoreError> {
        (**self)
            .complete_room(room_id, total_price, cost_per_member)
            .await
    }
}
