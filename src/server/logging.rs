//! Request logging middleware and coupon audit events.
//!
//! - Unique request ID per request, echoed in the `X-Request-Id` response header
//! - Request timing, method, path and status
//! - Structured events for coupon status changes
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware;
//! use coupons::server::logging::request_logging_middleware;
//!
//! let app = build_router(state).layer(middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Coupon state change event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponEvent {
    /// Coupon was created by an operator
    Created,
    /// Operator set the coupon to Inactive
    Deactivated,
    /// Operator handed the coupon back to the status engine
    Reactivated,
    /// A reconciliation pass changed the status
    StatusReconciled,
}

impl std::fmt::Display for CouponEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CouponEvent::Created => "created",
            CouponEvent::Deactivated => "deactivated",
            CouponEvent::Reactivated => "reactivated",
            CouponEvent::StatusReconciled => "status_reconciled",
        };
        write!(f, "{}", s)
    }
}

/// Log a coupon state change event.
pub fn log_coupon_event(event: CouponEvent, code: &str, details: Option<&str>) {
    let span = info_span!(
        "coupon_event",
        event = %event,
        code = %code,
    );
    let _enter = span.enter();

    if let Some(d) = details {
        info!(details = %d, "Coupon event occurred");
    } else {
        info!("Coupon event occurred");
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    span.in_scope(|| {
        info!(
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    });

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}
