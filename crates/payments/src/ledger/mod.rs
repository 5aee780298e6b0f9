//! Payment ledger store.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use common::{PaymentId, RoomId, UserId};

use crate::error::LedgerError;
use crate::record::{PaymentRecord, PaymentStatus};

pub use memory::InMemoryPaymentLedger;
pub use postgres::PostgresPaymentLedger;

/// Durable audit trail of payment attempts.
///
/// Listing operations return records newest first.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Persists a new record. Payment IDs are unique.
    async fn create_payment(&self, record: &PaymentRecord) -> Result<(), LedgerError>;

    /// Sets the status and gateway reference of an existing record.
    ///
    /// Fails with `PaymentNotFound` if no record has the given ID.
    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        gateway_payment_id: &str,
    ) -> Result<(), LedgerError>;

    /// Returns every record written for a room.
    async fn payments_by_room(&self, room_id: &RoomId) -> Result<Vec<PaymentRecord>, LedgerError>;

    /// Returns every record written for a user.
    async fn payments_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, LedgerError>;

    /// Looks up a record by payment ID.
    async fn payment_by_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>, LedgerError>;
}

#[async_trait]
impl<T: PaymentLedger + ?Sized> PaymentLedger for Arc<T> {
    async fn create_payment(&self, record: &PaymentRecord) -> Result<(), LedgerError> {
        (**self).create_payment(record).await
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        gateway_payment_id: &str,
    ) -> Result<(), LedgerError> {
        (**self)
            .update_payment_status(payment_id, status, gateway_payment_id)
            .await
    }

    async fn payments_by_room(&self, room_id: &RoomId) -> Result<Vec<PaymentRecord>, LedgerError> {
        (**self).payments_by_room(room_id).await
    }

    async fn payments_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, LedgerError> {
        (**self).payments_by_user(user_id).await
    }

    async fn payment_by_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        (**self).payment_by_id(payment_id).await
    }
}
