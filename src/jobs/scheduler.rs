//! Interval scheduler for coupon status passes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
use tracing::{error, info};

use super::{JobConfig, JobError, PassResult, StatusUpdater};

/// Drives [`StatusUpdater`] on a timer.
pub struct JobScheduler {
    scheduler: TokioJobScheduler,
    updater: Arc<StatusUpdater>,
    config: JobConfig,
}

impl JobScheduler {
    /// Create a new job scheduler.
    pub async fn new(updater: Arc<StatusUpdater>, config: JobConfig) -> Result<Self, JobError> {
        let scheduler = TokioJobScheduler::new()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        Ok(Self {
            scheduler,
            updater,
            config,
        })
    }

    /// Register the jobs and start ticking.
    pub async fn start(&self) -> Result<(), JobError> {
        info!("Starting coupon status scheduler");

        if self.config.run_on_startup {
            self.add_startup_job().await?;
        }
        self.add_interval_job().await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        info!("Coupon status scheduler started successfully");

        Ok(())
    }

    /// Stop the scheduler. No further passes are started after this returns.
    pub async fn shutdown(&mut self) -> Result<(), JobError> {
        info!("Shutting down coupon status scheduler");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;
        Ok(())
    }

    async fn add_startup_job(&self) -> Result<(), JobError> {
        let updater = Arc::clone(&self.updater);

        let job = Job::new_one_shot_async(Duration::ZERO, move |_uuid, _l| {
            let updater = Arc::clone(&updater);
            Box::pin(async move {
                info!("Running startup coupon status pass");
                log_outcome(updater.run().await);
            })
        })
        .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        Ok(())
    }

    async fn add_interval_job(&self) -> Result<(), JobError> {
        let updater = Arc::clone(&self.updater);

        let job = Job::new_repeated_async(
            self.config.status_update_interval,
            move |_uuid, _l| {
                let updater = Arc::clone(&updater);
                Box::pin(async move {
                    info!("Running coupon status pass at {}", Utc::now().naive_utc());
                    log_outcome(updater.run().await);
                })
            },
        )
        .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        info!(
            "Added coupon status job (every {}s)",
            self.config.status_update_interval.as_secs()
        );

        Ok(())
    }

    /// Run a pass immediately, through the same serialized entry point.
    pub async fn run_status_update_now(&self) -> PassResult {
        self.updater.run().await
    }
}

fn log_outcome(outcome: PassResult) {
    match outcome {
        Ok(report) => {
            if report.updated_count > 0 {
                info!(
                    "Coupon status pass: {} coupons updated",
                    report.updated_count
                );
            }
        }
        Err(e) => {
            // Retried on the next tick.
            error!("Coupon status pass failed: {}", e);
        }
    }
}
