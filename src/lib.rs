//! Coupon status lifecycle engine.
//!
//! Keeps each stored coupon's `status` consistent with its validity window:
//! a pure classifier ([`status::classify`]), a reconciliation pass that writes
//! only the coupons whose status is stale, and a scheduler plus HTTP trigger
//! that funnel into one serialized entry point.
//!
//! # Features
//!
//! - `server` - Store, handlers and router. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `admin-api` - Coupon create/read/deactivate/reactivate endpoints. Enabled by default.
//! - `background-jobs` - Interval scheduler for reconciliation passes. Enabled by default.
//!
//! # Example
//!
//! ```toml
//! # Server with PostgreSQL
//! coupon-lifecycle = { version = "0.1", features = ["postgres"] }
//!
//! # Classifier only
//! coupon-lifecycle = { version = "0.1", default-features = false }
//! ```

// Core modules (always available)
pub mod config;
pub mod errors;
pub mod status;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "server")]
pub mod jobs;
