//! Coupon status reconciliation pass.
//!
//! Reads every coupon, recomputes its status from the validity window and
//! writes back only the coupons whose stored status disagrees. `Inactive`
//! coupons belong to operators and are never touched.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::server::database::{Coupon, Database};
use crate::server::logging::{log_coupon_event, CouponEvent};
use crate::status::CouponStatus;

use super::JobError;

/// One status change applied by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub code: String,
    pub old_status: CouponStatus,
    pub new_status: CouponStatus,
}

/// A coupon that was skipped because it could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub code: String,
    pub error: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateReport {
    pub updated_count: usize,
    pub updated_coupons: Vec<StatusTransition>,
    pub errors: Vec<RecordError>,
}

/// A coupon whose stored status disagrees with its window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponNeedingUpdate {
    pub code: String,
    pub current_status: CouponStatus,
    pub computed_status: CouponStatus,
}

/// Work out what a coupon's status should become.
///
/// - `Ok(None)`: nothing to do (operator-owned or already correct)
/// - `Ok(Some((current, computed)))`: the stored status is stale
/// - `Err(reason)`: the record is malformed
fn plan_transition(
    coupon: &Coupon,
    today: NaiveDate,
) -> Result<Option<(CouponStatus, CouponStatus)>, String> {
    let current = coupon.status().map_err(|e| e.to_string())?;
    if !current.is_engine_managed() {
        return Ok(None);
    }

    let computed = coupon.window().map_err(|e| e.to_string())?.classify(today);

    if computed == current {
        Ok(None)
    } else {
        Ok(Some((current, computed)))
    }
}

/// Run one reconciliation pass as of `today`.
///
/// Failing to read the coupon list aborts the pass. Malformed records and
/// failed single-record writes are logged, skipped and listed in
/// [`StatusUpdateReport::errors`]; the pass carries on with the rest.
pub async fn run_status_update(
    db: &Database,
    today: NaiveDate,
) -> Result<StatusUpdateReport, JobError> {
    debug!("Reconciling coupon statuses for {}", today);

    let coupons = db.list_coupons().await?;
    let mut report = StatusUpdateReport::default();

    for coupon in &coupons {
        let (current, computed) = match plan_transition(coupon, today) {
            Ok(Some(change)) => change,
            Ok(None) => continue,
            Err(reason) => {
                warn!("Skipping coupon {}: {}", coupon.code, reason);
                report.errors.push(RecordError {
                    code: coupon.code.clone(),
                    error: reason,
                });
                continue;
            }
        };

        debug!(
            "Coupon {} is {} but its window says {}",
            coupon.code, current, computed
        );

        match db
            .update_coupon_status(&coupon.code, current, computed)
            .await
        {
            Ok(true) => {
                log_coupon_event(
                    CouponEvent::StatusReconciled,
                    &coupon.code,
                    Some(&format!("{current} -> {computed}")),
                );
                report.updated_coupons.push(StatusTransition {
                    code: coupon.code.clone(),
                    old_status: current,
                    new_status: computed,
                });
            }
            Ok(false) => {
                debug!(
                    "Coupon {} changed while the pass was running, leaving it alone",
                    coupon.code
                );
            }
            Err(e) => {
                warn!("Failed to update coupon {}: {}", coupon.code, e);
                report.errors.push(RecordError {
                    code: coupon.code.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report.updated_count = report.updated_coupons.len();

    info!(
        "Coupon status pass finished: {} checked, {} updated, {} skipped",
        coupons.len(),
        report.updated_count,
        report.errors.len()
    );

    Ok(report)
}

/// List coupons a pass would change as of `today`, without writing anything.
///
/// Malformed records are left out; a real pass reports them.
pub async fn preview_status_update(
    db: &Database,
    today: NaiveDate,
) -> Result<Vec<CouponNeedingUpdate>, JobError> {
    let coupons = db.list_coupons().await?;

    let pending = coupons
        .iter()
        .filter_map(|coupon| match plan_transition(coupon, today) {
            Ok(Some((current, computed))) => Some(CouponNeedingUpdate {
                code: coupon.code.clone(),
                current_status: current,
                computed_status: computed,
            }),
            Ok(None) => None,
            Err(reason) => {
                debug!("Preview ignoring coupon {}: {}", coupon.code, reason);
                None
            }
        })
        .collect();

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn coupon(start: &str, end: &str, status: &str) -> Coupon {
        let now = Utc::now().naive_utc();
        Coupon {
            code: "TEST10".to_string(),
            description: None,
            discount: 10.0,
            customer_eligibility: "all".to_string(),
            usage_limit: None,
            one_time_use: false,
            start_date: start.to_string(),
            end_date: end.to_string(),
            status_text: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn stale_status_is_planned() {
        let c = coupon("2024-01-01", "2024-01-31", "Future");
        assert_eq!(
            plan_transition(&c, jan_15()),
            Ok(Some((CouponStatus::Future, CouponStatus::Active)))
        );
    }

    #[test]
    fn correct_status_is_left_alone() {
        let c = coupon("2024-01-01", "2024-01-31", "Active");
        assert_eq!(plan_transition(&c, jan_15()), Ok(None));
    }

    #[test]
    fn inactive_is_skipped_even_with_a_bad_window() {
        let c = coupon("whenever", "2024-01-31", "Inactive");
        assert_eq!(plan_transition(&c, jan_15()), Ok(None));
    }

    #[test]
    fn malformed_records_are_errors() {
        assert!(plan_transition(&coupon("2024-01-01", "soon", "Active"), jan_15()).is_err());
        assert!(plan_transition(&coupon("2024-01-01", "2024-01-31", "Live"), jan_15()).is_err());
    }
}
