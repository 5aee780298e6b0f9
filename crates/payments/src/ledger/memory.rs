use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{PaymentId, RoomId, UserId};
use tokio::sync::RwLock;

use super::PaymentLedger;
use crate::error::LedgerError;
use crate::record::{PaymentRecord, PaymentStatus};

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<PaymentRecord>,
    fail_on_create: bool,
    fail_on_update: bool,
}

/// In-memory payment ledger.
///
/// Used by tests and by the server when no database is configured. Write
/// failures can be injected to exercise the abort-on-persistence-failure
/// paths of the settlement service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryPaymentLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `create_payment` calls fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Makes subsequent `update_payment_status` calls fail.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Returns the number of stored records.
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Returns every stored record in insertion order.
    pub async fn all_records(&self) -> Vec<PaymentRecord> {
        self.state.read().await.records.clone()
    }

    async fn select<F>(&self, predicate: F) -> Vec<PaymentRecord>
    where
        F: Fn(&PaymentRecord) -> bool,
    {
        let state = self.state.read().await;
        // Reverse insertion order first so that the stable sort keeps the
        // most recent write ahead of records sharing its timestamp.
        let mut records: Vec<_> = state
            .records
            .iter()
            .rev()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn create_payment(&self, record: &PaymentRecord) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if state.fail_on_create {
            return Err(LedgerError::Unavailable("create rejected".to_string()));
        }
        if state
            .records
            .iter()
            .any(|r| r.payment_id == record.payment_id)
        {
            return Err(LedgerError::Unavailable(format!(
                "duplicate payment id {}",
                record.payment_id
            )));
        }
        state.records.push(record.clone());
        Ok(())
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        gateway_payment_id: &str,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if state.fail_on_update {
            return Err(LedgerError::Unavailable("update rejected".to_string()));
        }
        let record = state
            .records
            .iter_mut()
            .find(|r| &r.payment_id == payment_id)
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.clone()))?;
        record.status = status;
        record.gateway_payment_id = gateway_payment_id.to_string();
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn payments_by_room(&self, room_id: &RoomId) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(self.select(|r| &r.room_id == room_id).await)
    }

    async fn payments_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(self.select(|r| &r.user_id == user_id).await)
    }

    async fn payment_by_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .find(|r| &r.payment_id == payment_id)
            .cloned())
    }
}
