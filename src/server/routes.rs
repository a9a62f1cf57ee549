use axum::{
    routing::{get, post},
    Router,
};

#[cfg(feature = "admin-api")]
use crate::server::admin::{
    create_coupon_handler, deactivate_coupon_handler, get_coupon_handler, list_coupons_handler,
    reactivate_coupon_handler,
};
use crate::server::handlers::{
    preview_status_update_handler, status_health_handler, trigger_status_update_handler, AppState,
};

/// Build the application router.
///
/// # Routes
///
/// ## Status engine
/// - `POST /api/v1/coupons/status/update` - Run a reconciliation pass (shared secret)
/// - `GET /api/v1/coupons/status/health` - Liveness check
/// - `GET /api/v1/coupons/status/preview` - Dry run: coupons a pass would change
///
/// ## Admin endpoints (requires `admin-api` feature)
/// - `POST /api/v1/coupons` - Create a coupon
/// - `GET /api/v1/coupons` - List coupons (`?status=` filter)
/// - `GET /api/v1/coupons/:code` - Get a coupon
/// - `POST /api/v1/coupons/:code/deactivate` - Set `Inactive`
/// - `POST /api/v1/coupons/:code/reactivate` - Recompute from the window
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route(
            "/api/v1/coupons/status/update",
            post(trigger_status_update_handler),
        )
        .route("/api/v1/coupons/status/health", get(status_health_handler))
        .route(
            "/api/v1/coupons/status/preview",
            get(preview_status_update_handler),
        );

    #[cfg(feature = "admin-api")]
    let router = router
        .route(
            "/api/v1/coupons",
            post(create_coupon_handler).get(list_coupons_handler),
        )
        .route("/api/v1/coupons/:code", get(get_coupon_handler))
        .route(
            "/api/v1/coupons/:code/deactivate",
            post(deactivate_coupon_handler),
        )
        .route(
            "/api/v1/coupons/:code/reactivate",
            post(reactivate_coupon_handler),
        );

    router.with_state(state)
}
