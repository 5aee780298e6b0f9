//! Payment gateway adapter.
//!
//! Pure protocol translation between settlement intents and the provider's
//! API. Every mutating call carries a caller-supplied idempotency key. No
//! retries happen here: only the caller knows whether repeating the ledger
//! write would be safe.

mod local;
mod yookassa;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub use local::LocalGateway;
pub use yookassa::{YooKassaConfig, YooKassaGateway};

/// Provider status of a payment created and awaiting the payer.
pub const STATUS_PENDING: &str = "pending";
/// Provider status of an authorized payment awaiting capture.
pub const STATUS_WAITING_FOR_CAPTURE: &str = "waiting_for_capture";
/// Provider status of a collected payment.
pub const STATUS_SUCCEEDED: &str = "succeeded";
/// Provider status of a cancelled payment.
pub const STATUS_CANCELED: &str = "canceled";

/// Amount as the provider expects it: a decimal string plus currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

impl Amount {
    /// Creates an amount from minor-unit money.
    pub fn new(money: Money, currency: impl Into<String>) -> Self {
        Self {
            value: money.to_string(),
            currency: currency.into(),
        }
    }
}

/// How the payer confirms the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_url: Option<String>,
}

impl Confirmation {
    /// A redirect confirmation returning the payer to `return_url`.
    pub fn redirect(return_url: impl Into<String>) -> Self {
        Self {
            kind: "redirect".to_string(),
            return_url: Some(return_url.into()),
            confirmation_url: None,
        }
    }
}

/// Body of a create-payment call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePaymentRequest {
    pub amount: Amount,
    pub confirmation: Confirmation,
    pub description: String,
    pub capture: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Body of a create-refund call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRefundRequest {
    pub payment_id: String,
    pub amount: Amount,
    pub description: String,
}

/// The provider's view of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub amount: Amount,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub confirmation: Option<Confirmation>,
}

/// The provider's view of a refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub status: String,
    pub amount: Amount,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Operations offered by an external payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment. Repeating a call with the same key must not create
    /// a second charge.
    async fn create_payment(
        &self,
        idempotency_key: &str,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, GatewayError>;

    /// Creates a refund against a previously created payment.
    async fn create_refund(
        &self,
        idempotency_key: &str,
        request: &CreateRefundRequest,
    ) -> Result<GatewayRefund, GatewayError>;

    /// Fetches the current state of a payment.
    async fn get_payment(&self, gateway_payment_id: &str) -> Result<GatewayPayment, GatewayError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn create_payment(
        &self,
        idempotency_key: &str,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, GatewayError> {
        (**self).create_payment(idempotency_key, request).await
    }

    async fn create_refund(
        &self,
        idempotency_key: &str,
        request: &CreateRefundRequest,
    ) -> Result<GatewayRefund, GatewayError> {
        (**self).create_refund(idempotency_key, request).await
    }

    async fn get_payment(&self, gateway_payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        (**self).get_payment(gateway_payment_id).await
    }
}
