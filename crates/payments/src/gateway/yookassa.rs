use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::{
    CreatePaymentRequest, CreateRefundRequest, GatewayPayment, GatewayRefund, PaymentGateway,
};
use crate::error::GatewayError;

const IDEMPOTENCE_KEY_HEADER: &str = "Idempotence-Key";

/// Connection settings for the YooKassa HTTP API.
#[derive(Clone)]
pub struct YooKassaConfig {
    pub shop_id: String,
    pub secret_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl YooKassaConfig {
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.yookassa.ru/v3";

    /// Creates settings for a shop with the default API root and a 30 s timeout.
    pub fn new(shop_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            secret_key: secret_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for YooKassaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YooKassaConfig")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Payment gateway backed by the YooKassa REST API.
///
/// Authenticates with HTTP basic auth (shop ID + secret key). Any response
/// other than 200 or 201 is an error carrying the raw provider body.
#[derive(Debug, Clone)]
pub struct YooKassaGateway {
    config: YooKassaConfig,
    client: Client,
}

impl YooKassaGateway {
    /// Builds the HTTP client for the given settings.
    pub fn new(config: YooKassaConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK && status != StatusCode::CREATED {
            tracing::debug!(status = status.as_u16(), %body, "gateway returned an error");
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PaymentGateway for YooKassaGateway {
    #[tracing::instrument(skip(self, request), fields(gateway = "yookassa"))]
    async fn create_payment(
        &self,
        idempotency_key: &str,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, GatewayError> {
        let builder = self
            .request(Method::POST, "/payments")
            .header(IDEMPOTENCE_KEY_HEADER, idempotency_key)
            .json(request);
        self.send(builder).await
    }

    #[tracing::instrument(skip(self, request), fields(gateway = "yookassa"))]
    async fn create_refund(
        &self,
        idempotency_key: &str,
        request: &CreateRefundRequest,
    ) -> Result<GatewayRefund, GatewayError> {
        let builder = self
            .request(Method::POST, "/refunds")
            .header(IDEMPOTENCE_KEY_HEADER, idempotency_key)
            .json(request);
        self.send(builder).await
    }

    #[tracing::instrument(skip(self), fields(gateway = "yookassa"))]
    async fn get_payment(&self, gateway_payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        let builder = self.request(Method::GET, &format!("/payments/{gateway_payment_id}"));
        self.send(builder).await
    }
}
