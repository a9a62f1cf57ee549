//! Error types shared by the coupon store, configuration and HTTP layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A database round trip failed (connect, query, timeout).
    #[error("database error: {0}")]
    DatabaseError(String),

    /// A coupon record or request payload is malformed.
    #[error("invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("coupon '{0}' already exists")]
    Conflict(String),
}

pub type CouponResult<T> = Result<T, CouponError>;
