//! Shared-secret check for the status trigger endpoint.
//!
//! When a trigger secret is configured (`trigger.secret` / `CRON_SECRET`), callers
//! must send `Authorization: Bearer <secret>`. Without a configured secret the
//! trigger is open.
//!
//! ```rust,ignore
//! async fn trigger(_auth: TriggerAuth, State(state): State<AppState>) -> impl IntoResponse {
//!     // only reached when the secret matched (or none is configured)
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::server::api_error::ErrorCode;
use crate::server::handlers::AppState;

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing Authorization header
    MissingToken,
    /// Authorization header is not a Bearer credential
    InvalidHeader,
    /// Secret does not match
    InvalidToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "missing authorization token"),
            AuthError::InvalidHeader => write!(f, "invalid authorization header format"),
            AuthError::InvalidToken => write!(f, "unauthorized"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::MissingToken => ErrorCode::MissingToken,
            AuthError::InvalidHeader => ErrorCode::InvalidHeader,
            AuthError::InvalidToken => ErrorCode::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.code();

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "code": code,
            "timestamp": Utc::now().to_rfc3339(),
        });

        (code.status_code(), Json(body)).into_response()
    }
}

/// Compare two secrets without short-circuiting on the first differing byte.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check an `Authorization` header value against the configured secret.
pub fn check_trigger_secret(header: Option<&str>, secret: Option<&str>) -> Result<(), AuthError> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let header = header.ok_or(AuthError::MissingToken)?;
    let presented = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidHeader)?
        .trim();

    if presented.is_empty() {
        return Err(AuthError::MissingToken);
    }

    if secrets_match(presented, secret) {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

/// Extractor that succeeds only for authorized trigger calls.
#[derive(Debug, Clone, Copy)]
pub struct TriggerAuth;

#[async_trait]
impl FromRequestParts<AppState> for TriggerAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidHeader)?),
            None => None,
        };

        check_trigger_secret(header, state.trigger_secret.as_deref()).map_err(|e| {
            warn!("Rejected status trigger: {}", e);
            e
        })?;

        Ok(TriggerAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_secret_configured() {
        assert!(check_trigger_secret(None, None).is_ok());
        assert!(check_trigger_secret(Some("Bearer anything"), None).is_ok());
    }

    #[test]
    fn missing_header_is_rejected() {
        assert_eq!(
            check_trigger_secret(None, Some("s3cret")),
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            check_trigger_secret(Some("Bearer "), Some("s3cret")),
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert_eq!(
            check_trigger_secret(Some("Basic czNjcmV0"), Some("s3cret")),
            Err(AuthError::InvalidHeader)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        assert_eq!(
            check_trigger_secret(Some("Bearer s3cret2"), Some("s3cret")),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn matching_secret_passes() {
        assert!(check_trigger_secret(Some("Bearer s3cret"), Some("s3cret")).is_ok());
    }

    #[test]
    fn rejections_use_error_code_statuses() {
        use axum::http::StatusCode;

        assert_eq!(
            AuthError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidHeader.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::InvalidToken.code(), ErrorCode::InvalidToken);
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
