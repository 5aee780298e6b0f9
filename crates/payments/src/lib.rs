//! Settlement of ride fares.
//!
//! This crate provides the three layers that turn "charge every rider their
//! share" into durable, auditable gateway calls:
//! - [`gateway`]: protocol translation to the external payment provider, with
//!   an HTTP-backed implementation and a deterministic local stub
//! - [`ledger`]: one [`PaymentRecord`] per payment attempt, persisted whether
//!   or not the gateway call succeeded
//! - [`settlement`]: the policy layer that sequences gateway calls and ledger
//!   writes and decides when a batch fails
//!
//! Batches are fail-fast and non-resumable: the first gateway error stops the
//! batch, records already written are kept, and the error is reported.

pub mod error;
pub mod gateway;
pub mod ledger;
pub mod record;
pub mod settlement;

pub use error::{GatewayError, LedgerError, PaymentError};
pub use gateway::{
    Amount, CreatePaymentRequest, CreateRefundRequest, GatewayPayment, GatewayRefund,
    LocalGateway, PaymentGateway, YooKassaConfig, YooKassaGateway,
};
pub use ledger::{InMemoryPaymentLedger, PaymentLedger, PostgresPaymentLedger};
pub use record::{PaymentRecord, PaymentStatus};
pub use settlement::{
    CURRENCY, DEFAULT_RETURN_URL, PaymentDetails, ProcessPayment, Settled, Settlement,
    SettlementService, payment_idempotency_key, refund_idempotency_key,
};
