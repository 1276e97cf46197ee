//! Shared error type across Wardbell crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Token could not be resolved to a subject.
    AuthFailed,
    /// Authenticated subject may not perform the operation.
    Forbidden,
    /// Unsupported config or protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WardbellError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum WardbellError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl WardbellError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            WardbellError::BadRequest(_) => ClientCode::BadRequest,
            WardbellError::AuthFailed => ClientCode::AuthFailed,
            WardbellError::Forbidden(_) => ClientCode::Forbidden,
            WardbellError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            WardbellError::Internal(_) => ClientCode::Internal,
        }
    }
}
