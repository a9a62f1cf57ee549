use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::jobs::{CouponNeedingUpdate, JobError, RecordError, StatusTransition, StatusUpdater};
use crate::server::auth::TriggerAuth;
use crate::server::database::Database;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// The single serialized entry point for status passes, shared with the scheduler.
    pub updater: Arc<StatusUpdater>,
    /// Secret required by the trigger endpoint, if any.
    pub trigger_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(updater: Arc<StatusUpdater>, trigger_secret: Option<String>) -> Self {
        Self {
            db: Arc::clone(updater.db()),
            updater,
            trigger_secret: trigger_secret.map(Arc::from),
        }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Failure envelope for the status endpoints.
#[derive(Debug, Serialize)]
pub struct StatusErrorResponse {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

impl From<JobError> for StatusErrorResponse {
    fn from(err: JobError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            timestamp: timestamp(),
        }
    }
}

impl IntoResponse for StatusErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Response of a successful trigger.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
    pub updated_coupons: Vec<StatusTransition>,
    pub errors: Vec<RecordError>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub success: bool,
    pub message: String,
    pub coupons_needing_update: Vec<CouponNeedingUpdate>,
}

/// Run a reconciliation pass on demand.
///
/// `POST /api/v1/coupons/status/update`
///
/// Goes through the same serialized entry point as the scheduler, so a call
/// arriving during a pass returns that pass's result.
pub async fn trigger_status_update_handler(
    _auth: TriggerAuth,
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse>, StatusErrorResponse> {
    info!("Coupon status update triggered");

    let report = state.updater.run().await.map_err(|e| {
        error!("Triggered coupon status update failed: {}", e);
        StatusErrorResponse::from(e)
    })?;

    let message = if report.updated_count == 0 {
        "All coupon statuses are up to date".to_string()
    } else {
        format!("Updated {} coupon statuses", report.updated_count)
    };

    Ok(Json(TriggerResponse {
        success: true,
        message,
        updated_count: report.updated_count,
        updated_coupons: report.updated_coupons,
        errors: report.errors,
        timestamp: timestamp(),
    }))
}

/// Liveness check; does not touch the database.
///
/// `GET /api/v1/coupons/status/health`
pub async fn status_health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Coupon status service is running".to_string(),
        timestamp: timestamp(),
    })
}

/// List coupons whose stored status disagrees with their window, without writing.
///
/// `GET /api/v1/coupons/status/preview`
pub async fn preview_status_update_handler(
    State(state): State<AppState>,
) -> Result<Json<PreviewResponse>, StatusErrorResponse> {
    let pending = state.updater.preview().await.map_err(|e| {
        error!("Coupon status preview failed: {}", e);
        StatusErrorResponse::from(e)
    })?;

    Ok(Json(PreviewResponse {
        success: true,
        message: format!("{} coupons need a status update", pending.len()),
        coupons_needing_update: pending,
    }))
}
