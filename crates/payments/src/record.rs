//! Ledger rows.

use chrono::{DateTime, Utc};
use common::{PaymentId, RoomId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::gateway;

/// Status of a single payment attempt.
///
/// Creation writes one of the gateway-derived states (or `Failed`). After
/// that the only transitions are made by the refund path:
/// ```text
/// Succeeded ──┬──► Refunded
///             └──► RefundFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created at the provider, awaiting the payer.
    Pending,
    /// Authorized, awaiting capture.
    WaitingForCapture,
    /// Money collected.
    Succeeded,
    /// Cancelled by the provider.
    Canceled,
    /// The gateway call failed; nothing was collected.
    Failed,
    /// Money returned to the payer.
    Refunded,
    /// A refund was attempted and the gateway rejected it.
    RefundFailed,
}

impl PaymentStatus {
    /// Maps a provider status string onto a ledger status.
    ///
    /// Unknown provider states are treated as `Pending`: the charge exists
    /// but cannot be considered collected.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            gateway::STATUS_SUCCEEDED => PaymentStatus::Succeeded,
            gateway::STATUS_WAITING_FOR_CAPTURE => PaymentStatus::WaitingForCapture,
            gateway::STATUS_CANCELED => PaymentStatus::Canceled,
            _ => PaymentStatus::Pending,
        }
    }

    /// Returns true if a refund may be issued for a payment in this state.
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded)
    }

    /// Returns the status name as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::WaitingForCapture => "waiting_for_capture",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::RefundFailed => "refund_failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "waiting_for_capture" => Ok(PaymentStatus::WaitingForCapture),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "canceled" => Ok(PaymentStatus::Canceled),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            "refund_failed" => Ok(PaymentStatus::RefundFailed),
            other => Err(LedgerError::UnknownStatus(other.to_string())),
        }
    }
}

/// One payment attempt for one participant of one ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub room_id: RoomId,
    pub user_id: UserId,
    /// Amount in major currency units.
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Provider-side payment ID. Empty when the gateway call failed.
    pub gateway_payment_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        payment_id: PaymentId,
        room_id: RoomId,
        user_id: UserId,
        amount: f64,
        currency: impl Into<String>,
        status: PaymentStatus,
        gateway_payment_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            payment_id,
            room_id,
            user_id,
            amount,
            currency: currency.into(),
            status,
            gateway_payment_id: gateway_payment_id.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_statuses_map_onto_ledger_statuses() {
        assert_eq!(
            PaymentStatus::from_gateway("succeeded"),
            PaymentStatus::Succeeded
        );
        assert_eq!(
            PaymentStatus::from_gateway("waiting_for_capture"),
            PaymentStatus::WaitingForCapture
        );
        assert_eq!(
            PaymentStatus::from_gateway("canceled"),
            PaymentStatus::Canceled
        );
        assert_eq!(PaymentStatus::from_gateway("pending"), PaymentStatus::Pending);
        assert_eq!(
            PaymentStatus::from_gateway("something_new"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn only_succeeded_is_refundable() {
        assert!(PaymentStatus::Succeeded.is_refundable());
        assert!(!PaymentStatus::Failed.is_refundable());
        assert!(!PaymentStatus::Pending.is_refundable());
        assert!(!PaymentStatus::Refunded.is_refundable());
        assert!(!PaymentStatus::RefundFailed.is_refundable());
    }

    #[test]
    fn stored_names_parse_back() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::WaitingForCapture,
            PaymentStatus::Succeeded,
            PaymentStatus::Canceled,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
            PaymentStatus::RefundFailed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("settled".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::RefundFailed).unwrap();
        assert_eq!(json, "\"refund_failed\"");
    }
}
