//! Admin API handlers for coupon management.
//!
//! Operator authentication is handled in front of this service.
//!
//! # Endpoints
//!
//! - `POST /api/v1/coupons` - Create a coupon
//! - `GET /api/v1/coupons?status={status}` - List coupons, optionally by status
//! - `GET /api/v1/coupons/{code}` - Get a coupon
//! - `POST /api/v1/coupons/{code}/deactivate` - Set the coupon to `Inactive`
//! - `POST /api/v1/coupons/{code}/reactivate` - Hand the coupon back to the status engine

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::api_error::ApiError;
use crate::server::database::Coupon;
use crate::server::handlers::AppState;
use crate::server::logging::{log_coupon_event, CouponEvent};
use crate::server::validation::{
    validate_coupon_code, validate_discount, validate_not_empty, validate_window,
    ValidationError,
};
use crate::status::CouponStatus;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a coupon.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub code: String,
    pub description: Option<String>,
    /// Percentage discount
    pub discount: f64,
    #[serde(default = "default_eligibility")]
    pub customer_eligibility: String,
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub one_time_use: bool,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`, inclusive
    pub end_date: String,
    /// Initial status; derived from the window when omitted
    pub status: Option<CouponStatus>,
}

fn default_eligibility() -> String {
    "all".to_string()
}

/// Query parameters for listing coupons.
#[derive(Debug, Deserialize)]
pub struct ListCouponsQuery {
    pub status: Option<CouponStatus>,
}

#[derive(Debug, Serialize)]
pub struct ListCouponsResponse {
    pub coupons: Vec<Coupon>,
    pub total: usize,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid_field(&err.field, &err.message)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a coupon.
///
/// `POST /api/v1/coupons`
pub async fn create_coupon_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    validate_coupon_code(&payload.code, "code")?;
    validate_discount(payload.discount, "discount")?;
    validate_not_empty(&payload.customer_eligibility, "customerEligibility")?;
    if matches!(payload.usage_limit, Some(limit) if limit <= 0) {
        return Err(ApiError::invalid_field("usageLimit", "must be positive"));
    }
    let window = validate_window(&payload.start_date, &payload.end_date)?;

    let status = payload
        .status
        .unwrap_or_else(|| window.classify(state.updater.today()));

    let now = Utc::now().naive_utc();
    let coupon = Coupon {
        code: payload.code,
        description: payload.description,
        discount: payload.discount,
        customer_eligibility: payload.customer_eligibility,
        usage_limit: payload.usage_limit,
        one_time_use: payload.one_time_use,
        start_date: window.start.format("%Y-%m-%d").to_string(),
        end_date: window.end.format("%Y-%m-%d").to_string(),
        status_text: status.as_str().to_string(),
        created_at: now,
        updated_at: now,
    };

    state.db.insert_coupon(&coupon).await?;

    log_coupon_event(
        CouponEvent::Created,
        &coupon.code,
        Some(&format!("status={status}")),
    );

    Ok((StatusCode::CREATED, Json(coupon)))
}

/// List coupons, optionally filtered by stored status.
///
/// `GET /api/v1/coupons`
pub async fn list_coupons_handler(
    State(state): State<AppState>,
    Query(query): Query<ListCouponsQuery>,
) -> Result<Json<ListCouponsResponse>, ApiError> {
    let coupons = match query.status {
        Some(status) => state.db.list_coupons_by_status(status).await?,
        None => state.db.list_coupons().await?,
    };

    Ok(Json(ListCouponsResponse {
        total: coupons.len(),
        coupons,
    }))
}

/// Get a coupon by code.
///
/// `GET /api/v1/coupons/{code}`
pub async fn get_coupon_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, ApiError> {
    state
        .db
        .get_coupon(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::coupon_not_found(&code))
}

/// Deactivate a coupon. The status engine leaves `Inactive` coupons alone.
///
/// `POST /api/v1/coupons/{code}/deactivate`
pub async fn deactivate_coupon_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, ApiError> {
    info!("Deactivating coupon {}", code);

    if !state
        .db
        .set_coupon_status(&code, CouponStatus::Inactive)
        .await?
    {
        return Err(ApiError::coupon_not_found(&code));
    }

    log_coupon_event(CouponEvent::Deactivated, &code, None);

    reload(&state, &code).await
}

/// Reactivate a coupon: its status is recomputed from its window as of today.
///
/// `POST /api/v1/coupons/{code}/reactivate`
pub async fn reactivate_coupon_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, ApiError> {
    info!("Reactivating coupon {}", code);

    let coupon = state
        .db
        .get_coupon(&code)
        .await?
        .ok_or_else(|| ApiError::coupon_not_found(&code))?;

    let status = coupon.window()?.classify(state.updater.today());

    if !state.db.set_coupon_status(&code, status).await? {
        return Err(ApiError::coupon_not_found(&code));
    }

    log_coupon_event(
        CouponEvent::Reactivated,
        &code,
        Some(&format!("status={status}")),
    );

    reload(&state, &code).await
}

async fn reload(state: &AppState, code: &str) -> Result<Json<Coupon>, ApiError> {
    state
        .db
        .get_coupon(code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::coupon_not_found(code))
}
