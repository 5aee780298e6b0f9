//! Room error types.

use common::{ErrorCode, RoomId};
use payments::PaymentError;
use thiserror::Error;

/// Errors returned by a room store.
#[derive(Debug, Error)]
pub enum RoomStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The room does not exist.
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// Adding the member would exceed the room's capacity.
    #[error("Room {0} is at capacity")]
    CapacityExceeded(RoomId),

    /// The room is already completed and cannot change.
    #[error("Room {0} is already completed")]
    AlreadyCompleted(RoomId),

    /// A stored status value is not recognized.
    #[error("Unknown room status: {0}")]
    UnknownStatus(String),

    /// The store refused the operation.
    #[error("Room store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by a route history sink.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A route was already recorded for the room.
    #[error("Route already recorded for room {0}")]
    AlreadyRecorded(RoomId),

    /// The sink refused the operation.
    #[error("Route history unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the room lifecycle service.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The request is missing a field or carries an invalid value.
    #[error("{0}")]
    InvalidArgument(String),

    /// The room does not exist.
    #[error("Room not found: {0}")]
    NotFound(RoomId),

    /// The request is valid but the room's state does not allow it.
    #[error("{0}")]
    FailedPrecondition(String),

    /// The ride was already completed.
    #[error("{0}")]
    AlreadyExists(String),

    /// A room store read or write failed.
    #[error("Room store error: {0}")]
    Store(#[from] RoomStoreError),

    /// A route history read failed.
    #[error("Route history error: {0}")]
    History(#[from] HistoryError),

    /// The room is completed but collecting the fare failed.
    #[error("Settlement failed for room {room_id}: {source}")]
    Settlement {
        room_id: RoomId,
        #[source]
        source: PaymentError,
    },
}

impl RoomError {
    /// Returns the caller-facing classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RoomError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            RoomError::NotFound(_) => ErrorCode::NotFound,
            RoomError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            RoomError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            RoomError::Store(_) | RoomError::History(_) | RoomError::Settlement { .. } => {
                ErrorCode::Internal
            }
        }
    }
}
