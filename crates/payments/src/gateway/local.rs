use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CreatePaymentRequest, CreateRefundRequest, GatewayPayment, GatewayRefund, PaymentGateway,
    STATUS_SUCCEEDED,
};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct LocalGatewayState {
    payments: HashMap<String, GatewayPayment>,
    payments_by_key: HashMap<String, String>,
    refunds_by_key: HashMap<String, GatewayRefund>,
    fail_on_create: bool,
    fail_creates_after: Option<usize>,
    fail_on_refund: bool,
}

/// Deterministic stand-in for the payment provider.
///
/// Used when no provider credentials are configured and by tests. Every
/// payment succeeds immediately with a `mock-` reference unless a failure
/// has been injected. Idempotency keys are honored: a repeated key returns
/// the first result and does not create a new charge.
#[derive(Debug, Clone, Default)]
pub struct LocalGateway {
    state: Arc<Mutex<LocalGatewayState>>,
}

impl LocalGateway {
    /// Creates a gateway that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LocalGatewayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every subsequent create-payment call fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state().fail_on_create = fail;
    }

    /// Lets `charges` more distinct charges succeed, then fails the rest.
    pub fn fail_creates_after(&self, charges: usize) {
        let mut state = self.state();
        let limit = state.payments.len() + charges;
        state.fail_creates_after = Some(limit);
    }

    /// Makes every subsequent create-refund call fail.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state().fail_on_refund = fail;
    }

    /// Returns the number of distinct charges created.
    pub fn charge_count(&self) -> usize {
        self.state().payments.len()
    }

    /// Returns the number of distinct refunds created.
    pub fn refund_count(&self) -> usize {
        self.state().refunds_by_key.len()
    }
}

#[async_trait]
impl PaymentGateway for LocalGateway {
    async fn create_payment(
        &self,
        idempotency_key: &str,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, GatewayError> {
        let mut state = self.state();

        if let Some(existing) = state
            .payments_by_key
            .get(idempotency_key)
            .and_then(|id| state.payments.get(id))
        {
            return Ok(existing.clone());
        }

        if state.fail_on_create {
            return Err(GatewayError::Declined("payment declined".to_string()));
        }
        if let Some(limit) = state.fail_creates_after
            && state.payments.len() >= limit
        {
            return Err(GatewayError::Declined("payment declined".to_string()));
        }

        let reference = request
            .metadata
            .get("payment_id")
            .map(String::as_str)
            .unwrap_or(idempotency_key);
        let payment = GatewayPayment {
            id: format!("mock-{reference}"),
            status: STATUS_SUCCEEDED.to_string(),
            amount: request.amount.clone(),
            description: Some(request.description.clone()),
            created_at: Some(Utc::now().to_rfc3339()),
            confirmation: None,
        };

        state
            .payments_by_key
            .insert(idempotency_key.to_string(), payment.id.clone());
        state.payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn create_refund(
        &self,
        idempotency_key: &str,
        request: &CreateRefundRequest,
    ) -> Result<GatewayRefund, GatewayError> {
        let mut state = self.state();

        if let Some(existing) = state.refunds_by_key.get(idempotency_key) {
            return Ok(existing.clone());
        }
        if state.fail_on_refund {
            return Err(GatewayError::Declined("refund declined".to_string()));
        }

        let refund = GatewayRefund {
            id: format!("mock-refund-{}", state.refunds_by_key.len() + 1),
            status: STATUS_SUCCEEDED.to_string(),
            amount: request.amount.clone(),
            created_at: Some(Utc::now().to_rfc3339()),
        };
        state
            .refunds_by_key
            .insert(idempotency_key.to_string(), refund.clone());
        Ok(refund)
    }

    async fn get_payment(&self, gateway_payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        self.state()
            .payments
            .get(gateway_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::Provider {
                status: 404,
                body: format!("payment {gateway_payment_id} not found"),
            })
    }
}
