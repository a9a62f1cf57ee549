//! Coupon status reconciliation jobs.
//!
//! - [`run_status_update`] / [`preview_status_update`]: one pass over every coupon
//! - [`StatusUpdater`]: the serialized entry point shared by the timer and the
//!   HTTP trigger; overlapping callers coalesce onto the in-flight pass
//! - `JobScheduler` (requires the `background-jobs` feature): runs a pass on
//!   startup and then on a fixed interval
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coupons::jobs::{JobConfig, JobScheduler, StatusUpdater};
//! use coupons::server::Database;
//!
//! let db = Database::new().await?;
//! let updater = Arc::new(StatusUpdater::new(db));
//! let mut scheduler = JobScheduler::new(updater, JobConfig::default()).await?;
//! scheduler.start().await?;
//! // ...
//! scheduler.shutdown().await?;
//! ```

use std::time::Duration;

use crate::config::JobsConfig;
use crate::errors::CouponError;

mod status_update;
mod updater;

#[cfg(feature = "background-jobs")]
mod scheduler;

pub use status_update::{
    preview_status_update, run_status_update, CouponNeedingUpdate, RecordError, StatusTransition,
    StatusUpdateReport,
};
pub use updater::{PassResult, StatusUpdater, DEFAULT_PASS_TIMEOUT};

#[cfg(feature = "background-jobs")]
pub use scheduler::JobScheduler;

/// Configuration for the interval scheduler.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Time between scheduled passes (default: 30 minutes)
    pub status_update_interval: Duration,
    /// Run one pass as soon as the scheduler starts (default: true)
    pub run_on_startup: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            status_update_interval: Duration::from_secs(30 * 60),
            run_on_startup: true,
        }
    }
}

impl From<&JobsConfig> for JobConfig {
    fn from(config: &JobsConfig) -> Self {
        Self {
            status_update_interval: config.interval(),
            run_on_startup: config.run_on_startup,
        }
    }
}

/// Errors that can occur while scheduling or running a pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Status update pass timed out after {0:?}")]
    Timeout(Duration),

    #[error("Job execution error: {0}")]
    ExecutionError(String),
}

impl From<CouponError> for JobError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::ConfigError(msg) => JobError::ConfigError(msg),
            CouponError::DatabaseError(msg) => JobError::DatabaseError(msg),
            other => JobError::ExecutionError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = JobConfig::default();
        assert_eq!(config.status_update_interval, Duration::from_secs(1800));
        assert!(config.run_on_startup);
    }

    #[test]
    fn job_config_follows_jobs_section() {
        let jobs = JobsConfig {
            enabled: true,
            run_on_startup: false,
            interval_secs: 120,
            pass_timeout_secs: 5,
        };
        let config = JobConfig::from(&jobs);
        assert_eq!(config.status_update_interval, Duration::from_secs(120));
        assert!(!config.run_on_startup);
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = JobError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "Status update pass timed out after 200ms");
    }

    #[test]
    fn coupon_errors_keep_their_class() {
        assert_eq!(
            JobError::from(CouponError::ConfigError("no url".into())),
            JobError::ConfigError("no url".into())
        );
        assert_eq!(
            JobError::from(CouponError::DatabaseError("gone".into())),
            JobError::DatabaseError("gone".into())
        );
    }
}
