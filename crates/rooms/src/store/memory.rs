use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{RoomId, UserId};
use tokio::sync::RwLock;

use super::RoomStore;
use crate::error::RoomStoreError;
use crate::room::{Room, RoomStatus};

#[derive(Debug, Default)]
struct RoomStoreState {
    rooms: HashMap<RoomId, Room>,
    fail_on_write: bool,
    writes: usize,
}

impl RoomStoreState {
    fn begin_write(&mut self) -> Result<(), RoomStoreError> {
        if self.fail_on_write {
            return Err(RoomStoreError::Unavailable("write rejected".to_string()));
        }
        self.writes += 1;
        Ok(())
    }

    fn room_mut(&mut self, room_id: &RoomId) -> Result<&mut Room, RoomStoreError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomStoreError::RoomNotFound(room_id.clone()))
    }
}

/// In-memory room store.
///
/// Every operation runs under a single write lock, which makes the capacity
/// check and the insert of a join one critical section.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoomStore {
    state: Arc<RwLock<RoomStoreState>>,
}

impl InMemoryRoomStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Returns the number of writes accepted so far.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// Returns the number of stored rooms.
    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn create_room(&self, room: &Room) -> Result<(), RoomStoreError> {
        let mut state = self.state.write().await;
        state.begin_write()?;
        if state.rooms.contains_key(&room.id) {
            return Err(RoomStoreError::Unavailable(format!(
                "duplicate room id {}",
                room.id
            )));
        }
        state.rooms.insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), RoomStoreError> {
        let mut state = self.state.write().await;
        state.begin_write()?;
        let room = state.room_mut(room_id)?;
        if room.status.is_terminal() {
            return Err(RoomStoreError::AlreadyCompleted(room_id.clone()));
        }
        if room.is_member(user_id) {
            return Ok(());
        }
        if room.is_at_capacity() {
            return Err(RoomStoreError::CapacityExceeded(room_id.clone()));
        }
        room.members.push(user_id.clone());
        Ok(())
    }

    async fn remove_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<(), RoomStoreError> {
        let mut state = self.state.write().await;
        state.begin_write()?;
        if let Some(room) = state.rooms.get_mut(room_id) {
            room.members.retain(|m| m != user_id);
        }
        Ok(())
    }

    async fn room_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, RoomStoreError> {
        Ok(self.state.read().await.rooms.get(room_id).cloned())
    }

    async fn list_available_rooms(&self) -> Result<Vec<Room>, RoomStoreError> {
        let state = self.state.read().await;
        let mut rooms: Vec<_> = state
            .rooms
            .values()
            .filter(|r| r.status == RoomStatus::Waiting)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn update_room_status(
        &self,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<(), RoomStoreError> {
        let mut state = self.state.write().await;
        state.begin_write()?;
        let room = state.room_mut(room_id)?;
        if room.status.is_terminal() {
            return Err(RoomStoreError::AlreadyCompleted(room_id.clone()));
        }
        room.status = status;
        Ok(())
    }

    async fn room_members(&self, room_id: &RoomId) -> Result<Vec<UserId>, RoomStoreError> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .get(room_id)
            .map(|r| r.members.clone())
            .unwrap_or_default())
    }

    async fn complete_room(
        &self,
        room_id: &RoomId,
        total_price: f64,
        cost_per_member: f64,
    ) -> Result<(), RoomStoreError> {
        let mut state = self.state.write().await;
        state.begin_write()?;
        let room = state.room_mut(room_id)?;
        if !room.status.can_complete() {
            return Err(RoomStoreError::AlreadyCompleted(room_id.clone()));
        }
        room.status = RoomStatus::Completed;
        room.total_price = total_price;
        room.cost_per_member = cost_per_member;
        Ok(())
    }
}
