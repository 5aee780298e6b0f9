//! Room lifecycle service.

use common::{Money, RoomId, UserId};
use payments::{ProcessPayment, Settlement};

use crate::error::{RoomError, RoomStoreError};
use crate::history::{NewRoute, Route, RouteHistory};
use crate::room::{CompleteRide, NewRoom, RideReceipt, Room, RoomStatus};
use crate::store::RoomStore;

/// Message of the error returned when a join finds every seat taken.
pub const ROOM_FULL: &str = "room is full";

/// Message of the error returned when a completed ride is touched again.
pub const RIDE_COMPLETED: &str = "ride already completed";

fn require(id: &str, field: &str) -> Result<(), RoomError> {
    if id.trim().is_empty() {
        return Err(RoomError::InvalidArgument(format!("{field} is required")));
    }
    Ok(())
}

/// Service that drives a room from creation to completion.
///
/// Ride completion runs as a fixed sequence:
/// 1. persist the room as completed with its fare split
/// 2. dispatch the route-history write without waiting for it
/// 3. settle the fare with every member and report the outcome
///
/// The completed state is never rolled back. If settlement fails the caller
/// gets an internal error and the ledger shows how far collection got.
#[derive(Debug, Clone)]
pub struct RoomService<S, P, H> {
    store: S,
    settlement: P,
    history: H,
}

impl<S, P, H> RoomService<S, P, H>
where
    S: RoomStore,
    P: Settlement,
    H: RouteHistory + Clone + 'static,
{
    /// Creates a new room service.
    pub fn new(store: S, settlement: P, history: H) -> Self {
        Self {
            store,
            settlement,
            history,
        }
    }

    /// Gets a reference to the room store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opens a room with the creator as its first member.
    #[tracing::instrument(skip(self), fields(creator_id = %new_room.creator_id))]
    pub async fn create_room(&self, new_room: NewRoom) -> Result<Room, RoomError> {
        require(new_room.creator_id.as_str(), "creator_id")?;
        if new_room.capacity == 0 {
            return Err(RoomError::InvalidArgument(
                "capacity must be positive".to_string(),
            ));
        }
        if !new_room.start_location.is_present() {
            return Err(RoomError::InvalidArgument(
                "start_location is required".to_string(),
            ));
        }
        if !new_room.end_location.is_present() {
            return Err(RoomError::InvalidArgument(
                "end_location is required".to_string(),
            ));
        }

        let room = Room::open(RoomId::generate(), new_room);
        self.store.create_room(&room).await?;

        metrics::counter!("rooms_created_total").increment(1);
        tracing::info!(room_id = %room.id, capacity = room.capacity, "room created");
        Ok(room)
    }

    /// Adds a user to a room.
    ///
    /// A join that finds the room at capacity marks it full before failing.
    #[tracing::instrument(skip(self))]
    pub async fn join_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<Room, RoomError> {
        require(room_id.as_str(), "room_id")?;
        require(user_id.as_str(), "user_id")?;

        let room = self.load(room_id).await?;
        if !room.status.can_join() {
            return Err(RoomError::FailedPrecondition(RIDE_COMPLETED.to_string()));
        }
        if room.is_member(user_id) {
            return Ok(room);
        }

        let members = self.store.room_members(room_id).await?;
        if members.len() >= room.capacity as usize {
            return Err(self.reject_full(&room).await);
        }

        match self.store.add_member(room_id, user_id).await {
            Ok(()) => {}
            Err(RoomStoreError::CapacityExceeded(_)) => return Err(self.reject_full(&room).await),
            Err(RoomStoreError::AlreadyCompleted(_)) => {
                return Err(RoomError::FailedPrecondition(RIDE_COMPLETED.to_string()));
            }
            Err(RoomStoreError::RoomNotFound(id)) => return Err(RoomError::NotFound(id)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!("member joined");
        self.load(room_id).await
    }

    /// Removes a user from a room. Removing a non-member succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn exit_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, RoomError> {
        require(room_id.as_str(), "room_id")?;
        require(user_id.as_str(), "user_id")?;

        self.store.remove_member(room_id, user_id).await?;
        tracing::info!("member left");
        Ok(true)
    }

    /// Lists rooms that are waiting for members.
    #[tracing::instrument(skip(self))]
    pub async fn find_rooms(&self) -> Result<Vec<Room>, RoomError> {
        Ok(self.store.list_available_rooms().await?)
    }

    /// Loads a room with its members.
    #[tracing::instrument(skip(self))]
    pub async fn room_details(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        require(room_id.as_str(), "room_id")?;
        self.load(room_id).await
    }

    /// Completes a ride and charges every member their share.
    #[tracing::instrument(skip(self), fields(room_id = %ride.room_id, driver_id = %ride.driver_id))]
    pub async fn complete_ride(&self, ride: CompleteRide) -> Result<RideReceipt, RoomError> {
        require(ride.room_id.as_str(), "room_id")?;
        require(ride.driver_id.as_str(), "driver_id")?;
        if !ride.total_price.is_finite() || ride.total_price <= 0.0 {
            return Err(RoomError::InvalidArgument(
                "total_price must be positive".to_string(),
            ));
        }
        if !ride.distance_km.is_finite() || ride.distance_km < 0.0 {
            return Err(RoomError::InvalidArgument(
                "distance_km must not be negative".to_string(),
            ));
        }

        let room = self.load(&ride.room_id).await?;
        if !room.status.can_complete() {
            return Err(RoomError::AlreadyExists(RIDE_COMPLETED.to_string()));
        }

        let members = self.store.room_members(&ride.room_id).await?;
        if members.is_empty() {
            return Err(RoomError::FailedPrecondition(
                "room has no members to bill".to_string(),
            ));
        }

        let cost_per_member = ride.total_price / members.len() as f64;
        if !Money::from_major(cost_per_member).is_positive() {
            return Err(RoomError::InvalidArgument(format!(
                "total_price {} split {} ways is below the smallest chargeable amount",
                ride.total_price,
                members.len()
            )));
        }
        match self
            .store
            .complete_room(&ride.room_id, ride.total_price, cost_per_member)
            .await
        {
            Ok(()) => {}
            Err(RoomStoreError::AlreadyCompleted(_)) => {
                return Err(RoomError::AlreadyExists(RIDE_COMPLETED.to_string()));
            }
            Err(RoomStoreError::RoomNotFound(id)) => return Err(RoomError::NotFound(id)),
            Err(e) => return Err(e.into()),
        }
        metrics::counter!("rides_completed_total").increment(1);
        tracing::info!(
            members = members.len(),
            total_price = ride.total_price,
            cost_per_member,
            "ride completed"
        );

        self.record_route(NewRoute {
            room_id: ride.room_id.clone(),
            driver_id: ride.driver_id.clone(),
            start_point: room.start_location.describe(),
            end_point: room.end_location.describe(),
            distance_km: ride.distance_km,
            total_price: ride.total_price,
            passenger_ids: members.clone(),
        });

        let settled = self
            .settlement
            .process_payment(ProcessPayment {
                room_id: ride.room_id.clone(),
                user_ids: members,
                amount_per_user: cost_per_member,
                description: String::new(),
            })
            .await
            .map_err(|source| {
                tracing::error!(error = %source, "settlement failed after ride completion");
                RoomError::Settlement {
                    room_id: ride.room_id.clone(),
                    source,
                }
            })?;

        Ok(RideReceipt {
            total_price: ride.total_price,
            cost_per_member,
            payments_count: settled.payments.len(),
        })
    }

    /// Lists the trips a user drove or rode on, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn user_routes(&self, user_id: &UserId) -> Result<Vec<Route>, RoomError> {
        require(user_id.as_str(), "user_id")?;
        Ok(self.history.routes_for_user(user_id).await?)
    }

    async fn load(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.store
            .room_by_id(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Persists the full status and returns the rejection for the join.
    async fn reject_full(&self, room: &Room) -> RoomError {
        if room.status == RoomStatus::Full {
            return RoomError::FailedPrecondition(ROOM_FULL.to_string());
        }
        match self.store.update_room_status(&room.id, RoomStatus::Full).await {
            Ok(()) => {
                tracing::info!(room_id = %room.id, "room is full");
                RoomError::FailedPrecondition(ROOM_FULL.to_string())
            }
            Err(RoomStoreError::AlreadyCompleted(_)) => {
                RoomError::FailedPrecondition(RIDE_COMPLETED.to_string())
            }
            Err(e) => e.into(),
        }
    }

    fn record_route(&self, route: NewRoute) {
        let history = self.history.clone();
        tokio::spawn(async move {
            match history.save_route(&route).await {
                Ok(route_id) => {
                    tracing::debug!(room_id = %route.room_id, %route_id, "route recorded");
                }
                Err(e) => {
                    metrics::counter!("route_history_failures_total").increment(1);
                    tracing::warn!(room_id = %route.room_id, error = %e, "failed to record route");
                }
            }
        });
    }
}
