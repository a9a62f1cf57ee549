//! Coupon status classification.
//!
//! A coupon's `status` column is a denormalized copy of what its validity
//! window says about today. This module holds the pure mapping from window and
//! date to status, and the normalization of stored date text to UTC calendar
//! days that the mapping relies on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CouponError, CouponResult};

/// Lifecycle status of a coupon.
///
/// `Active`, `Expired` and `Future` are derived from the validity window.
/// `Inactive` is set by an operator and is never produced by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouponStatus {
    Active,
    Inactive,
    Expired,
    Future,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Active => "Active",
            CouponStatus::Inactive => "Inactive",
            CouponStatus::Expired => "Expired",
            CouponStatus::Future => "Future",
        }
    }

    /// Whether the reconciliation pass may change this status.
    pub fn is_engine_managed(&self) -> bool {
        !matches!(self, CouponStatus::Inactive)
    }
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponStatus {
    type Err = CouponError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(CouponStatus::Active),
            "Inactive" => Ok(CouponStatus::Inactive),
            "Expired" => Ok(CouponStatus::Expired),
            "Future" => Ok(CouponStatus::Future),
            other => Err(CouponError::InvalidCoupon(format!(
                "unknown coupon status '{other}'"
            ))),
        }
    }
}

/// Compute the status a coupon should have on `today`.
///
/// All three dates are calendar days; callers normalize timestamps with
/// [`parse_coupon_date`] first.
pub fn classify(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> CouponStatus {
    if today < start {
        CouponStatus::Future
    } else if today > end {
        CouponStatus::Expired
    } else {
        CouponStatus::Active
    }
}

/// Normalize a stored date value to a UTC calendar day.
///
/// Accepted forms:
/// - `2024-01-31`
/// - RFC 3339 with any offset, e.g. `2024-01-31T23:30:00-05:00` (converted to UTC first)
/// - naive `2024-01-31T10:00:00` or `2024-01-31T10:00:00.000`, taken as UTC
pub fn parse_coupon_date(value: &str) -> CouponResult<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }

    Err(CouponError::InvalidCoupon(format!(
        "invalid date '{value}' (expected YYYY-MM-DD or an RFC 3339 timestamp)"
    )))
}

/// Inclusive validity window of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ValidityWindow {
    /// Parse both ends of a stored window. `start <= end` is not checked here.
    pub fn parse(start: &str, end: &str) -> CouponResult<Self> {
        let start = parse_coupon_date(start)
            .map_err(|e| CouponError::InvalidCoupon(format!("start_date: {e}")))?;
        let end = parse_coupon_date(end)
            .map_err(|e| CouponError::InvalidCoupon(format!("end_date: {e}")))?;
        Ok(Self { start, end })
    }

    pub fn classify(&self, today: NaiveDate) -> CouponStatus {
        classify(self.start, self.end, today)
    }
}

/// Source of "today" for reconciliation.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Today's date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
