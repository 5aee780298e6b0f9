//! Room model and status state machine.

use chrono::{DateTime, Utc};
use common::{RoomId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::RoomStoreError;

/// The status of a room in its lifecycle.
///
/// State transitions:
/// ```text
/// Waiting ──► Full
///    │          │
///    └──────────┴──► Completed
/// ```
/// There is no way back from `Full` to `Waiting`, and `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Accepting members.
    #[default]
    Waiting,

    /// A join attempt found every seat taken.
    Full,

    /// The ride is over and the fare was split (terminal state).
    Completed,
}

impl RoomStatus {
    /// Returns true if new members may be considered in this state.
    pub fn can_join(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the ride can be completed in this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, RoomStatus::Waiting | RoomStatus::Full)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoomStatus::Completed)
    }

    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Full => "full",
            RoomStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = RoomStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoomStatus::Waiting),
            "full" => Ok(RoomStatus::Full),
            "completed" => Ok(RoomStatus::Completed),
            other => Err(RoomStoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// A pickup or drop-off point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
}

impl Location {
    /// Creates a location from coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: String::new(),
        }
    }

    /// Attaches a human-readable address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Returns true if the location carries an address or non-zero coordinates.
    pub fn is_present(&self) -> bool {
        !self.address.trim().is_empty() || self.latitude != 0.0 || self.longitude != 0.0
    }

    /// Returns the address, or the coordinates when there is none.
    pub fn describe(&self) -> String {
        if self.address.trim().is_empty() {
            format!("{:.6},{:.6}", self.latitude, self.longitude)
        } else {
            self.address.clone()
        }
    }
}

/// A shared-ride room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub creator_id: UserId,
    /// Seat capacity, counting the creator.
    pub capacity: u32,
    /// Members in join order. The creator is always first.
    pub members: Vec<UserId>,
    pub status: RoomStatus,
    pub start_location: Location,
    pub end_location: Location,
    pub scheduled_time: DateTime<Utc>,
    /// Set once, on completion.
    pub total_price: f64,
    /// Set once, on completion.
    pub cost_per_member: f64,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Opens a new room with the creator as its only member.
    pub fn open(id: RoomId, new_room: NewRoom) -> Self {
        Self {
            id,
            members: vec![new_room.creator_id.clone()],
            creator_id: new_room.creator_id,
            capacity: new_room.capacity,
            status: RoomStatus::Waiting,
            start_location: new_room.start_location,
            end_location: new_room.end_location,
            scheduled_time: new_room.scheduled_time,
            total_price: 0.0,
            cost_per_member: 0.0,
            created_at: Utc::now(),
        }
    }

    /// Returns the number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the user is a member.
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    /// Returns true if every seat is taken.
    pub fn is_at_capacity(&self) -> bool {
        self.members.len() >= self.capacity as usize
    }
}

/// Request to open a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoom {
    pub creator_id: UserId,
    pub capacity: u32,
    pub start_location: Location,
    pub end_location: Location,
    pub scheduled_time: DateTime<Utc>,
}

/// Request to finish a ride and collect the fare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRide {
    pub room_id: RoomId,
    pub driver_id: UserId,
    pub total_price: f64,
    pub distance_km: f64,
}

/// Outcome of a successful ride completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideReceipt {
    pub total_price: f64,
    pub cost_per_member: f64,
    pub payments_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_room(capacity: u32) -> NewRoom {
        NewRoom {
            creator_id: UserId::new("driver-1"),
            capacity,
            start_location: Location::new(55.75, 37.61).with_address("Red Square"),
            end_location: Location::new(55.97, 37.41),
            scheduled_time: Utc::now(),
        }
    }

    #[test]
    fn test_default_status_is_waiting() {
        assert_eq!(RoomStatus::default(), RoomStatus::Waiting);
    }

    #[test]
    fn test_only_completed_is_terminal() {
        assert!(!RoomStatus::Waiting.is_terminal());
        assert!(!RoomStatus::Full.is_terminal());
        assert!(RoomStatus::Completed.is_terminal());

        assert!(RoomStatus::Waiting.can_complete());
        assert!(RoomStatus::Full.can_complete());
        assert!(!RoomStatus::Completed.can_complete());
        assert!(!RoomStatus::Completed.can_join());
    }

    #[test]
    fn test_status_names_parse_back() {
        for status in [RoomStatus::Waiting, RoomStatus::Full, RoomStatus::Completed] {
            assert_eq!(status.as_str().parse::<RoomStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status)
            );
        }
        assert!("cancelled".parse::<RoomStatus>().is_err());
    }

    #[test]
    fn test_location_presence() {
        assert!(!Location::default().is_present());
        assert!(Location::new(0.0, 0.0).with_address("Depot").is_present());
        assert!(Location::new(55.0, 0.0).is_present());
        assert!(!Location::new(0.0, 0.0).with_address("   ").is_present());
    }

    #[test]
    fn test_location_describe() {
        assert_eq!(
            Location::new(1.0, 2.0).with_address("Airport").describe(),
            "Airport"
        );
        assert_eq!(Location::new(1.5, 2.25).describe(), "1.500000,2.250000");
    }

    #[test]
    fn test_open_room() {
        let room = Room::open(RoomId::new("room-1"), new_room(3));
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.members, vec![UserId::new("driver-1")]);
        assert_eq!(room.total_price, 0.0);
        assert_eq!(room.cost_per_member, 0.0);
        assert!(!room.is_at_capacity());
    }

    #[test]
    fn test_capacity() {
        let mut room = Room::open(RoomId::new("room-1"), new_room(2));
        room.members.push(UserId::new("passenger-1"));
        assert!(room.is_at_capacity());
        assert!(room.is_member(&UserId::new("passenger-1")));
        assert_eq!(room.member_count(), 2);
    }
}
