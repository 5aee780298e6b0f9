//! Caller-facing error classification shared by every service.

use serde::{Deserialize, Serialize};

/// Classification of a failed operation, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or malformed caller input. Never retried by the system.
    InvalidArgument,
    /// The referenced room or payment does not exist.
    NotFound,
    /// Valid request, but the current state forbids it.
    FailedPrecondition,
    /// Duplicate completion attempt.
    AlreadyExists,
    /// Caller identity missing or invalid.
    Unauthenticated,
    /// Storage failure, gateway failure or any unexpected downstream fault.
    Internal,
}

impl ErrorCode {
    /// Returns the code name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::NotFound => "not_found",
            ErrorCode::FailedPrecondition => "failed_precondition",
            ErrorCode::AlreadyExists => "already_exists",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
