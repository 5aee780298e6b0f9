//! Shared-ride rooms.
//!
//! This crate owns a room from creation to completion:
//! - [`room`]: the room model and its status state machine
//! - [`store`]: persistence of rooms and memberships, with capacity enforced
//!   by the store itself
//! - [`history`]: the best-effort record of completed trips
//! - [`service`]: the lifecycle operations, including the ride completion
//!   path that hands off to settlement

pub mod error;
pub mod history;
pub mod room;
pub mod service;
pub mod store;

pub use error::{HistoryError, RoomError, RoomStoreError};
pub use history::{InMemoryRouteHistory, NewRoute, PostgresRouteHistory, Route, RouteHistory};
pub use room::{CompleteRide, Location, NewRoom, RideReceipt, Room, RoomStatus};
pub use service::{RIDE_COMPLETED, ROOM_FULL, RoomService};
pub use store::{InMemoryRoomStore, PostgresRoomStore, RoomStore};
