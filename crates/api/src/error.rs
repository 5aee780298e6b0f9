//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ErrorCode;
use payments::PaymentError;
use rooms::RoomError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Caller identity is missing.
    Unauthenticated(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Room lifecycle error.
    Room(RoomError),
    /// Settlement error.
    Payment(PaymentError),
}

impl ApiError {
    /// Returns the caller-facing classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            ApiError::BadRequest(_) => ErrorCode::InvalidArgument,
            ApiError::Room(err) => err.code(),
            ApiError::Payment(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Room(err) => err.to_string(),
            ApiError::Payment(err) => err.to_string(),
        }
    }
}

/// Maps an error classification onto an HTTP status.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::FailedPrecondition | ErrorCode::AlreadyExists => StatusCode::CONFLICT,
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = self.message();
        if code == ErrorCode::Internal {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message, "code": code.as_str() });
        (status_for(code), axum::Json(body)).into_response()
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        ApiError::Room(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
