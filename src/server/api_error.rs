//! Standardized API error responses for the coupon admin endpoints.
//!
//! # Response Format
//!
//! ```json
//! {
//!   "error": {
//!     "code": "COUPON_NOT_FOUND",
//!     "message": "Coupon 'SUMMER10' not found",
//!     "details": null
//!   }
//! }
//! ```
//!
//! The status trigger and preview endpoints keep their own
//! `{ success, error, timestamp }` envelope (see `handlers`); trigger auth
//! rejections reuse [`ErrorCode`] for their `code` field and HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::CouponError;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Coupon Errors (4xx) ===
    /// Coupon code was not found in the database
    CouponNotFound,
    /// A coupon with this code already exists
    CouponExists,

    // === Validation Errors (400) ===
    /// Request payload is invalid or malformed
    InvalidRequest,
    /// A field value is invalid
    InvalidField,

    // === Authentication Errors (400/401) ===
    /// No trigger secret provided
    MissingToken,
    /// Authorization header is malformed
    InvalidHeader,
    /// Trigger secret does not match
    InvalidToken,

    // === Server Errors (5xx) ===
    /// Database operation failed
    DatabaseError,
    /// Server configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidField | ErrorCode::InvalidHeader => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::MissingToken | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::CouponNotFound => StatusCode::NOT_FOUND,
            ErrorCode::CouponExists => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::CouponNotFound => "The requested coupon does not exist",
            ErrorCode::CouponExists => "A coupon with this code already exists",
            ErrorCode::InvalidRequest => "Request payload is invalid",
            ErrorCode::InvalidField => "A field value is invalid",
            ErrorCode::MissingToken => "Trigger secret is required",
            ErrorCode::InvalidHeader => "Authorization header is malformed",
            ErrorCode::InvalidToken => "Trigger secret is invalid",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ConfigError => "Server configuration error",
        }
    }
}

/// The inner error object containing code, message, and optional details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

impl ApiError {
    /// Creates a new API error with the default message for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.error.code.status_code()
    }

    pub fn coupon_not_found(code: &str) -> Self {
        Self::with_message(
            ErrorCode::CouponNotFound,
            format!("Coupon '{}' not found", code),
        )
    }

    /// Invalid request error with field details.
    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::with_details(
            ErrorCode::InvalidField,
            format!("Invalid value for '{}': {}", field, reason),
            serde_json::json!({ "field": field }),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.code.default_message(),
            self.error.message
        )
    }
}

impl std::error::Error for ApiError {}

impl From<CouponError> for ApiError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::ConfigError(msg) => ApiError::with_message(ErrorCode::ConfigError, msg),
            // Driver messages stay in the logs.
            CouponError::DatabaseError(_) => ApiError::new(ErrorCode::DatabaseError),
            CouponError::InvalidCoupon(msg) => {
                ApiError::with_message(ErrorCode::InvalidRequest, msg)
            }
            CouponError::Conflict(code) => ApiError::with_message(
                ErrorCode::CouponExists,
                format!("Coupon '{}' already exists", code),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(
            ErrorCode::CouponNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::InvalidRequest.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidHeader.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::MissingToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::CouponExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::DatabaseError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn api_error_serialization() {
        let err = ApiError::coupon_not_found("SUMMER10");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("COUPON_NOT_FOUND"));
        assert!(json.contains("SUMMER10"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn api_error_with_details() {
        let err = ApiError::invalid_field("discount", "must be between 0 and 100");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("INVALID_FIELD"));
        assert!(json.contains("\"field\":\"discount\""));
    }

    #[test]
    fn database_details_are_hidden() {
        let err: ApiError = CouponError::DatabaseError("pool timed out at 10.0.0.3".into()).into();
        assert_eq!(err.error.code, ErrorCode::DatabaseError);
        assert!(!err.error.message.contains("10.0.0.3"));
    }

    #[test]
    fn conflict_maps_to_409() {
        let err: ApiError = CouponError::Conflict("SUMMER10".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
