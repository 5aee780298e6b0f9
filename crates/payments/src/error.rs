//! Payment error types.

use common::{ErrorCode, PaymentId, UserId};
use thiserror::Error;

/// Errors returned by a payment gateway adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP client could not be built.
    #[error("Gateway client initialization failed: {0}")]
    Initialization(String),

    /// The request could not be sent or timed out.
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Gateway error [{status}]: {body}")]
    Provider { status: u16, body: String },

    /// The provider's response body could not be decoded.
    #[error("Gateway response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payment was declined by the local stub.
    #[error("Payment declined: {0}")]
    Declined(String),
}

/// Errors returned by a payment ledger store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The payment to update does not exist.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// A stored status value is not recognized.
    #[error("Unknown payment status: {0}")]
    UnknownStatus(String),

    /// The store refused the write.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the settlement service.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request is missing a field or carries an invalid value.
    #[error("{0}")]
    InvalidArgument(String),

    /// No payment exists with the given ID.
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    /// A ledger read or write failed.
    #[error("Payment ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The gateway rejected a charge. The failed attempt is already recorded.
    #[error("Gateway error for user {user_id}: {source}")]
    Gateway {
        user_id: UserId,
        #[source]
        source: GatewayError,
    },

    /// The gateway rejected a refund. The failed attempt is already recorded.
    #[error("Gateway refund error for payment {payment_id}: {source}")]
    RefundGateway {
        payment_id: PaymentId,
        #[source]
        source: GatewayError,
    },
}

impl PaymentError {
    /// Returns the caller-facing classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            PaymentError::NotFound(_) => ErrorCode::NotFound,
            PaymentError::Ledger(_)
            | PaymentError::Gateway { .. }
            | PaymentError::RefundGateway { .. } => ErrorCode::Internal,
        }
    }
}
