//! Relay error types.
//!
//! Domain errors are plain enums returned synchronously by the ledger, the
//! access gate and the admin surface. [`ApiError`] is the HTTP presentation
//! of any of them; conversions live in `adapters::error_conversions`.

use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;

/// Stable machine-readable error codes carried in response bodies.
pub mod codes {
    // Admission
    pub const EMPTY: &str = "EMPTY";
    pub const TOO_SHORT: &str = "TOO_SHORT";
    pub const TOO_LONG: &str = "TOO_LONG";
    pub const CONTAINS_WHITESPACE: &str = "CONTAINS_WHITESPACE";
    pub const INVALID_CHARSET: &str = "INVALID_CHARSET";
    pub const ALREADY_USED: &str = "ALREADY_USED";

    // Access / admin
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const MISSING_ADDRESS: &str = "MISSING_ADDRESS";
    pub const INVALID_MODE: &str = "INVALID_MODE";
    pub const DENIED: &str = "DENIED";

    // Transport
    pub const INVALID_BODY: &str = "INVALID_BODY";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const NOTIFICATION_FAILED: &str = "NOTIFICATION_FAILED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Why a transaction id was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("Transaction ID is required")]
    Empty,
    #[error("Transaction ID must be at least 8 characters")]
    TooShort,
    #[error("Transaction ID must be at most 100 characters")]
    TooLong,
    #[error("Transaction ID must not contain spaces")]
    ContainsWhitespace,
    #[error("Transaction ID may only contain letters, digits, '-' and '_'")]
    InvalidCharset,
    #[error("Transaction ID has already been used")]
    AlreadyUsed,
}

impl AdmissionError {
    /// Machine-readable code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => codes::EMPTY,
            Self::TooShort => codes::TOO_SHORT,
            Self::TooLong => codes::TOO_LONG,
            Self::ContainsWhitespace => codes::CONTAINS_WHITESPACE,
            Self::InvalidCharset => codes::INVALID_CHARSET,
            Self::AlreadyUsed => codes::ALREADY_USED,
        }
    }
}

/// Access gate and admin surface errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Missing or wrong shared secret. Carries no detail about the attempt.
    #[error("Unauthorized")]
    Unauthorized,
    #[error("IP address is required")]
    MissingAddress,
    #[error("Invalid mode '{0}': expected 'whitelist' or 'blacklist'")]
    InvalidMode(String),
    #[error("Access denied from this IP address")]
    Denied(String),
}

impl AccessError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => codes::UNAUTHORIZED,
            Self::MissingAddress => codes::MISSING_ADDRESS,
            Self::InvalidMode(_) => codes::INVALID_MODE,
            Self::Denied(_) => codes::DENIED,
        }
    }
}

/// HTTP-facing error: status, code, message and optional extra body fields.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Extra fields merged into the response body (must be a JSON object)
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Request body was not valid JSON or had the wrong shape
    pub fn invalid_body(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_BODY,
            format!("Invalid request body: {}", details.into()),
        )
    }

    pub fn payload_too_large() -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            "Request body too large",
        )
    }

    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            StatusCode::REQUEST_TIMEOUT,
            codes::TIMEOUT,
            format!("Request exceeded {}ms timeout", after.as_millis()),
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            AccessError::Unauthorized.to_string(),
        )
    }

    /// IP gate denial; echoes the resolved address back to the caller
    pub fn denied(addr: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::DENIED,
            AccessError::Denied(addr.to_string()).to_string(),
        )
        .with_data(serde_json::json!({ "ip": addr }))
    }

    pub fn rate_limited(retry_after_ms: u64) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            codes::RATE_LIMITED,
            "Rate limit exceeded",
        )
        .with_data(serde_json::json!({ "retryAfterMs": retry_after_ms }))
    }

    pub fn notification_failed(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            codes::NOTIFICATION_FAILED,
            format!("Failed to deliver notification: {}", details.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    /// Response body: `{ success: false, error, code, ...data }`
    pub fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        });
        if let (Some(serde_json::Value::Object(extra)), Some(obj)) =
            (&self.data, body.as_object_mut())
        {
            for (key, value) in extra {
                obj.insert(key.clone(), value.clone());
            }
        }
        body
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.body().serialize(serializer)
    }
}

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Process-level errors (startup, serving), not per-request outcomes.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("notifier setup failed: {0}")]
    Notifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
