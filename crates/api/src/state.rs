//! Shared application state.

use std::sync::Arc;

use payments::{
    InMemoryPaymentLedger, LocalGateway, PaymentGateway, PaymentLedger, SettlementService,
};
use rooms::{InMemoryRoomStore, InMemoryRouteHistory, RoomService, RoomStore, RouteHistory};

/// Settlement over type-erased ledger and gateway backends.
pub type Payments = SettlementService<Arc<dyn PaymentLedger>, Arc<dyn PaymentGateway>>;

/// Room lifecycle over type-erased backends.
pub type Rooms = RoomService<Arc<dyn RoomStore>, Arc<Payments>, Arc<dyn RouteHistory>>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub rooms: Rooms,
    pub payments: Arc<Payments>,
}

impl AppState {
    /// Wires the services over the given backends.
    pub fn new(
        room_store: Arc<dyn RoomStore>,
        ledger: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn PaymentGateway>,
        history: Arc<dyn RouteHistory>,
        return_url: impl Into<String>,
    ) -> Self {
        let payments = Arc::new(SettlementService::new(ledger, gateway).with_return_url(return_url));
        let rooms = RoomService::new(room_store, payments.clone(), history);
        Self { rooms, payments }
    }

    /// In-memory stores and the local gateway.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRoomStore::new()),
            Arc::new(InMemoryPaymentLedger::new()),
            Arc::new(LocalGateway::new()),
            Arc::new(InMemoryRouteHistory::new()),
            payments::DEFAULT_RETURN_URL,
        )
    }
}
