// src/server/mod.rs

//! Server-side components.
//!
//! This module contains:
//! - `database`    → coupon store over SQLite/Postgres
//! - `handlers`    → status trigger, health and preview handlers
//! - `auth`        → shared-secret check for the trigger
//! - `admin`       → coupon admin API (requires `admin-api` feature)
//! - `api_error`   → structured error responses
//! - `logging`     → request logging middleware and coupon events
//! - `routes`      → router builder
//! - `validation`  → request validation utilities

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("the `server` feature needs at least one of the `sqlite` or `postgres` features");

pub mod api_error;
pub mod auth;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod validation;

#[cfg(feature = "admin-api")]
pub mod admin;

pub use api_error::{ApiError, ErrorCode};
pub use auth::{check_trigger_secret, AuthError, TriggerAuth};
pub use database::{Coupon, Database};
pub use handlers::{
    preview_status_update_handler, status_health_handler, trigger_status_update_handler,
    AppState,
};
pub use logging::{log_coupon_event, request_logging_middleware, CouponEvent};
pub use routes::build_router;

#[cfg(feature = "admin-api")]
pub use admin::{
    create_coupon_handler, deactivate_coupon_handler, get_coupon_handler, list_coupons_handler,
    reactivate_coupon_handler, CreateCouponRequest, ListCouponsResponse,
};

pub use validation::{
    validate_coupon_code, validate_discount, validate_not_empty, validate_window,
    ValidationError, ValidationResult,
};
