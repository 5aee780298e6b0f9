//! Settlement policy.
//!
//! [`SettlementService`] sequences gateway calls and ledger writes. Each
//! participant is handled in turn: charge, then record the attempt whatever
//! its outcome. A ledger failure aborts immediately; a gateway failure aborts
//! after the failed attempt is recorded. Rows already written are kept.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use common::{Money, PaymentId, RoomId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;
use crate::gateway::{
    Amount, Confirmation, CreatePaymentRequest, CreateRefundRequest, GatewayPayment,
    PaymentGateway,
};
use crate::ledger::PaymentLedger;
use crate::record::{PaymentRecord, PaymentStatus};

/// The single currency rides are settled in.
pub const CURRENCY: &str = "RUB";

/// Where the provider sends the payer after confirmation.
pub const DEFAULT_RETURN_URL: &str = "https://weride.app/payment/success";

const DEFAULT_REFUND_REASON: &str = "Ride cancelled";

/// Idempotency key for charging `user_id` for the ride in `room_id`.
///
/// The room ID is length-prefixed so that no two (room, user) pairs share a
/// key, whatever characters the IDs contain.
pub fn payment_idempotency_key(room_id: &RoomId, user_id: &UserId) -> String {
    format!("{}:{room_id}:{user_id}", room_id.as_str().len())
}

/// Idempotency key for refunding the ledger payment `payment_id`.
pub fn refund_idempotency_key(payment_id: &PaymentId) -> String {
    format!("refund-{payment_id}")
}

/// Request to charge every participant of a ride the same amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPayment {
    pub room_id: RoomId,
    pub user_ids: Vec<UserId>,
    /// Amount per participant in major currency units.
    pub amount_per_user: f64,
    /// Payment description shown to the payer. Empty means the default.
    #[serde(default)]
    pub description: String,
}

/// Outcome of a settlement batch that charged every participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settled {
    pub payments: Vec<PaymentRecord>,
    pub success: bool,
}

/// A ledger record together with the provider's current view of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentDetails {
    pub record: PaymentRecord,
    /// `None` when the record has no gateway ID or the lookup failed.
    pub gateway: Option<GatewayPayment>,
}

/// Settlement operations the room lifecycle depends on.
#[async_trait]
pub trait Settlement: Send + Sync {
    /// Charges every listed participant. Fails on the first gateway error.
    async fn process_payment(&self, request: ProcessPayment) -> Result<Settled, PaymentError>;

    /// Refunds every succeeded payment of a room. Returns the refunded records.
    async fn refund_payment(
        &self,
        room_id: &RoomId,
        reason: &str,
    ) -> Result<Vec<PaymentRecord>, PaymentError>;

    /// Returns a user's payments, newest first.
    async fn payment_history(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, PaymentError>;
}

#[async_trait]
impl<T: Settlement + ?Sized> Settlement for Arc<T> {
    async fn process_payment(&self, request: ProcessPayment) -> Result<Settled, PaymentError> {
        (**self).process_payment(request).await
    }

    async fn refund_payment(
        &self,
        room_id: &RoomId,
        reason: &str,
    ) -> Result<Vec<PaymentRecord>, PaymentError> {
        (**self).refund_payment(room_id, reason).await
    }

    async fn payment_history(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, PaymentError> {
        (**self).payment_history(user_id).await
    }
}

/// Settlement over a payment ledger and a payment gateway.
#[derive(Debug, Clone)]
pub struct SettlementService<L, G> {
    ledger: L,
    gateway: G,
    return_url: String,
}

impl<L, G> SettlementService<L, G>
where
    L: PaymentLedger,
    G: PaymentGateway,
{
    /// Creates a service using the default return URL.
    pub fn new(ledger: L, gateway: G) -> Self {
        Self {
            ledger,
            gateway,
            return_url: DEFAULT_RETURN_URL.to_string(),
        }
    }

    /// Overrides the URL the payer is redirected to after confirmation.
    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = return_url.into();
        self
    }

    /// Gets a reference to the payment ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Gets a reference to the payment gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Looks up a payment and asks the provider for its current state.
    ///
    /// The provider's answer is reported as-is and never written back.
    #[tracing::instrument(skip(self))]
    pub async fn payment_details(
        &self,
        payment_id: &PaymentId,
    ) -> Result<PaymentDetails, PaymentError> {
        if payment_id.is_blank() {
            return Err(PaymentError::InvalidArgument(
                "payment_id is required".to_string(),
            ));
        }

        let record = self
            .ledger
            .payment_by_id(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.clone()))?;

        let gateway = if record.gateway_payment_id.is_empty() {
            None
        } else {
            match self.gateway.get_payment(&record.gateway_payment_id).await {
                Ok(payment) => Some(payment),
                Err(e) => {
                    tracing::warn!(
                        payment_id = %payment_id,
                        gateway_payment_id = %record.gateway_payment_id,
                        error = %e,
                        "gateway lookup failed"
                    );
                    None
                }
            }
        };

        Ok(PaymentDetails { record, gateway })
    }

    fn payment_request(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        payment_id: &PaymentId,
        amount: Money,
        description: &str,
    ) -> CreatePaymentRequest {
        let mut metadata = BTreeMap::new();
        metadata.insert("room_id".to_string(), room_id.to_string());
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("payment_id".to_string(), payment_id.to_string());

        CreatePaymentRequest {
            amount: Amount::new(amount, CURRENCY),
            confirmation: Confirmation::redirect(self.return_url.clone()),
            description: description.to_string(),
            capture: true,
            metadata,
        }
    }

    /// Charges one participant and records the attempt.
    async fn charge(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        amount_per_user: f64,
        amount: Money,
        description: &str,
    ) -> Result<PaymentRecord, PaymentError> {
        let payment_id = PaymentId::generate();
        let key = payment_idempotency_key(room_id, user_id);
        let request = self.payment_request(room_id, user_id, &payment_id, amount, description);

        let outcome = self.gateway.create_payment(&key, &request).await;
        let (status, gateway_payment_id) = match &outcome {
            Ok(payment) => (PaymentStatus::from_gateway(&payment.status), payment.id.clone()),
            Err(_) => (PaymentStatus::Failed, String::new()),
        };

        let record = PaymentRecord::new(
            payment_id,
            room_id.clone(),
            user_id.clone(),
            amount_per_user,
            CURRENCY,
            status,
            gateway_payment_id,
            description,
        );
        self.ledger.create_payment(&record).await?;

        match outcome {
            Ok(_) => {
                metrics::counter!("payments_created_total").increment(1);
                tracing::info!(
                    payment_id = %record.payment_id,
                    user_id = %user_id,
                    status = %record.status,
                    "payment recorded"
                );
                Ok(record)
            }
            Err(source) => {
                metrics::counter!("payment_failures_total").increment(1);
                tracing::warn!(
                    payment_id = %record.payment_id,
                    user_id = %user_id,
                    error = %source,
                    "gateway rejected payment"
                );
                Err(PaymentError::Gateway {
                    user_id: user_id.clone(),
                    source,
                })
            }
        }
    }
}

fn validate(request: &ProcessPayment) -> Result<Money, PaymentError> {
    if request.room_id.is_blank() {
        return Err(PaymentError::InvalidArgument(
            "room_id is required".to_string(),
        ));
    }
    if request.user_ids.is_empty() {
        return Err(PaymentError::InvalidArgument(
            "user_ids must not be empty".to_string(),
        ));
    }
    if request.user_ids.iter().any(UserId::is_blank) {
        return Err(PaymentError::InvalidArgument(
            "user_ids must not contain empty IDs".to_string(),
        ));
    }
    if !request.amount_per_user.is_finite() || request.amount_per_user <= 0.0 {
        return Err(PaymentError::InvalidArgument(
            "amount_per_user must be positive".to_string(),
        ));
    }
    let amount = Money::from_major(request.amount_per_user);
    if !amount.is_positive() {
        return Err(PaymentError::InvalidArgument(format!(
            "amount_per_user {} is below the smallest chargeable amount",
            request.amount_per_user
        )));
    }
    Ok(amount)
}

#[async_trait]
impl<L, G> Settlement for SettlementService<L, G>
where
    L: PaymentLedger,
    G: PaymentGateway,
{
    #[tracing::instrument(
        skip(self, request),
        fields(room_id = %request.room_id, participants = request.user_ids.len())
    )]
    async fn process_payment(&self, request: ProcessPayment) -> Result<Settled, PaymentError> {
        let amount = validate(&request)?;
        let started = Instant::now();

        let description = if request.description.trim().is_empty() {
            format!("Ride payment (room {})", request.room_id)
        } else {
            request.description.clone()
        };

        let mut payments = Vec::with_capacity(request.user_ids.len());
        for user_id in &request.user_ids {
            let record = self
                .charge(
                    &request.room_id,
                    user_id,
                    request.amount_per_user,
                    amount,
                    &description,
                )
                .await;
            match record {
                Ok(record) => payments.push(record),
                Err(e) => {
                    metrics::histogram!("settlement_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    return Err(e);
                }
            }
        }

        metrics::histogram!("settlement_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(payments = payments.len(), "settlement completed");
        Ok(Settled {
            payments,
            success: true,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn refund_payment(
        &self,
        room_id: &RoomId,
        reason: &str,
    ) -> Result<Vec<PaymentRecord>, PaymentError> {
        if room_id.is_blank() {
            return Err(PaymentError::InvalidArgument(
                "room_id is required".to_string(),
            ));
        }
        let reason = if reason.trim().is_empty() {
            DEFAULT_REFUND_REASON
        } else {
            reason
        };

        let records = self.ledger.payments_by_room(room_id).await?;
        let mut refunded = Vec::new();

        for record in records.into_iter().filter(|r| r.status.is_refundable()) {
            let key = refund_idempotency_key(&record.payment_id);
            let request = CreateRefundRequest {
                payment_id: record.gateway_payment_id.clone(),
                amount: Amount::new(Money::from_major(record.amount), CURRENCY),
                description: reason.to_string(),
            };

            let outcome = self.gateway.create_refund(&key, &request).await;
            let status = if outcome.is_ok() {
                PaymentStatus::Refunded
            } else {
                PaymentStatus::RefundFailed
            };
            self.ledger
                .update_payment_status(&record.payment_id, status, &record.gateway_payment_id)
                .await?;

            if let Err(source) = outcome {
                metrics::counter!("refund_failures_total").increment(1);
                tracing::warn!(
                    payment_id = %record.payment_id,
                    error = %source,
                    "gateway rejected refund"
                );
                return Err(PaymentError::RefundGateway {
                    payment_id: record.payment_id,
                    source,
                });
            }

            metrics::counter!("refunds_total").increment(1);
            tracing::info!(payment_id = %record.payment_id, "payment refunded");
            refunded.push(PaymentRecord {
                status,
                description: reason.to_string(),
                ..record
            });
        }

        Ok(refunded)
    }

    #[tracing::instrument(skip(self))]
    async fn payment_history(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, PaymentError> {
        if user_id.is_blank() {
            return Err(PaymentError::InvalidArgument(
                "user_id is required".to_string(),
            ));
        }
        Ok(self.ledger.payments_by_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LocalGateway;
    use crate::ledger::InMemoryPaymentLedger;

    fn service() -> (
        SettlementService<InMemoryPaymentLedger, LocalGateway>,
        InMemoryPaymentLedger,
        LocalGateway,
    ) {
        let ledger = InMemoryPaymentLedger::new();
        let gateway = LocalGateway::new();
        let service = SettlementService::new(ledger.clone(), gateway.clone());
        (service, ledger, gateway)
    }

    fn batch(room: &str, users: &[&str], amount: f64) -> ProcessPayment {
        ProcessPayment {
            room_id: RoomId::new(room),
            user_ids: users.iter().map(|u| UserId::new(*u)).collect(),
            amount_per_user: amount,
            description: String::new(),
        }
    }

    #[test]
    fn test_idempotency_keys() {
        assert_eq!(
            payment_idempotency_key(&RoomId::new("room-1"), &UserId::new("u1")),
            "6:room-1:u1"
        );
        assert_ne!(
            payment_idempotency_key(&RoomId::new("a"), &UserId::new("b-c")),
            payment_idempotency_key(&RoomId::new("a-b"), &UserId::new("c"))
        );
        assert_ne!(
            payment_idempotency_key(&RoomId::new("a"), &UserId::new("b:c")),
            payment_idempotency_key(&RoomId::new("a:b"), &UserId::new("c"))
        );
        assert_eq!(refund_idempotency_key(&PaymentId::new("p-1")), "refund-p-1");
    }

    #[tokio::test]
    async fn test_default_description() {
        let (service, _, _) = service();
        let settled = service
            .process_payment(batch("room-1", &["u1"], 100.0))
            .await
            .unwrap();
        assert_eq!(settled.payments[0].description, "Ride payment (room room-1)");
        assert_eq!(settled.payments[0].currency, CURRENCY);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_write() {
        let (service, ledger, gateway) = service();

        for request in [
            batch("", &["u1"], 100.0),
            batch("room-1", &[], 100.0),
            batch("room-1", &["u1", ""], 100.0),
            batch("room-1", &["u1"], 0.0),
            batch("room-1", &["u1"], -5.0),
            batch("room-1", &["u1"], f64::NAN),
            batch("room-1", &["u1"], 0.001),
        ] {
            let err = service.process_payment(request).await.unwrap_err();
            assert!(matches!(err, PaymentError::InvalidArgument(_)));
        }
        assert_eq!(ledger.record_count().await, 0);
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_aborts_batch() {
        let (service, ledger, gateway) = service();
        ledger.set_fail_on_create(true).await;

        let err = service
            .process_payment(batch("room-1", &["u1", "u2"], 50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Ledger(_)));
        // The first charge reached the gateway before its record failed.
        assert_eq!(gateway.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_refund_ledger_failure_aborts() {
        let (service, ledger, gateway) = service();
        service
            .process_payment(batch("room-1", &["u1", "u2"], 50.0))
            .await
            .unwrap();
        ledger.set_fail_on_update(true).await;

        let err = service
            .refund_payment(&RoomId::new("room-1"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Ledger(_)));
        assert_eq!(gateway.refund_count(), 1);
    }

    #[tokio::test]
    async fn test_payment_details_includes_live_view() {
        let (service, _, _) = service();
        let settled = service
            .process_payment(batch("room-1", &["u1"], 100.0))
            .await
            .unwrap();
        let payment_id = settled.payments[0].payment_id.clone();

        let details = service.payment_details(&payment_id).await.unwrap();
        assert_eq!(details.record.payment_id, payment_id);
        let live = details.gateway.unwrap();
        assert_eq!(live.id, format!("mock-{payment_id}"));
        assert_eq!(live.amount.value, "100.00");
    }

    #[tokio::test]
    async fn test_payment_details_without_gateway_id() {
        let (service, ledger, gateway) = service();
        gateway.set_fail_on_create(true);
        let _ = service
            .process_payment(batch("room-1", &["u1"], 100.0))
            .await;
        let record = ledger.all_records().await.remove(0);
        assert_eq!(record.status, PaymentStatus::Failed);

        let details = service.payment_details(&record.payment_id).await.unwrap();
        assert!(details.gateway.is_none());

        let missing = service
            .payment_details(&PaymentId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(missing, PaymentError::NotFound(_)));
    }
}
