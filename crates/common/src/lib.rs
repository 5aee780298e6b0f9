//! Shared types for the ride settlement workspace.
//!
//! Identifiers are string newtypes so that values produced elsewhere (caller
//! identities, gateway references, database keys) round-trip unchanged.

pub mod error;
pub mod money;
pub mod types;

pub use error::ErrorCode;
pub use money::Money;
pub use types::{PaymentId, RoomId, RouteId, UserId};
