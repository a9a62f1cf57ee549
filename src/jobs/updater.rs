//! Serialized entry point for reconciliation passes.
//!
//! Timer ticks and HTTP triggers both go through [`StatusUpdater`]. At most one
//! pass runs at a time: a caller arriving while a pass is in flight does not
//! start another one, it waits for the in-flight pass and gets its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::server::database::Database;
use crate::status::{Clock, SystemClock};

use super::status_update::{
    preview_status_update, run_status_update, CouponNeedingUpdate, StatusUpdateReport,
};
use super::JobError;

/// Result of one pass, shared with every caller that coalesced onto it.
pub type PassResult = Result<StatusUpdateReport, JobError>;

type InFlight = watch::Receiver<Option<PassResult>>;

/// Default upper bound on a single pass.
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(30);

pub struct StatusUpdater {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    pass_timeout: Duration,
    in_flight: Mutex<Option<InFlight>>,
    passes_started: AtomicU64,
}

enum Role {
    Leader(watch::Sender<Option<PassResult>>),
    Follower(InFlight),
}

/// Clears the in-flight slot when the owning pass ends, however it ends.
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<InFlight>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl StatusUpdater {
    /// Updater reading today's date from the system clock (UTC).
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            pass_timeout: DEFAULT_PASS_TIMEOUT,
            in_flight: Mutex::new(None),
            passes_started: AtomicU64::new(0),
        }
    }

    pub fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Number of passes actually executed (coalesced callers do not count).
    pub fn passes_started(&self) -> u64 {
        self.passes_started.load(Ordering::SeqCst)
    }

    /// Run a pass as of today.
    pub async fn run(&self) -> PassResult {
        self.run_for(self.clock.today()).await
    }

    /// Run a pass as of `today`, or join the one already in flight.
    pub async fn run_for(&self, today: NaiveDate) -> PassResult {
        let role = {
            let mut slot = self
                .in_flight
                .lock()
                .map_err(|_| JobError::ExecutionError("in-flight guard poisoned".to_string()))?;

            if let Some(receiver) = slot.as_ref() {
                Role::Follower(receiver.clone())
            } else {
                let (sender, receiver) = watch::channel(None);
                *slot = Some(receiver);
                Role::Leader(sender)
            }
        };

        let sender = match role {
            Role::Leader(sender) => sender,
            Role::Follower(receiver) => return Self::join_in_flight(receiver).await,
        };
        let _guard = InFlightGuard {
            slot: &self.in_flight,
        };

        self.passes_started.fetch_add(1, Ordering::SeqCst);

        let result =
            match tokio::time::timeout(self.pass_timeout, run_status_update(&self.db, today)).await
            {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        "Coupon status pass timed out after {:?}",
                        self.pass_timeout
                    );
                    Err(JobError::Timeout(self.pass_timeout))
                }
            };

        sender.send_replace(Some(result.clone()));
        result
    }

    async fn join_in_flight(mut receiver: InFlight) -> PassResult {
        info!("Coupon status pass already running, waiting for its result");

        match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => {
                let outcome: Option<PassResult> = (*outcome).clone();
                outcome.unwrap_or_else(|| {
                    Err(JobError::ExecutionError(
                        "in-flight pass finished without a result".to_string(),
                    ))
                })
            }
            Err(_) => {
                debug!("In-flight pass was dropped before completing");
                Err(JobError::ExecutionError(
                    "in-flight pass was cancelled".to_string(),
                ))
            }
        }
    }

    /// Coupons a pass would change today. Does not take the in-flight guard.
    pub async fn preview(&self) -> Result<Vec<CouponNeedingUpdate>, JobError> {
        self.preview_for(self.clock.today()).await
    }

    pub async fn preview_for(&self, today: NaiveDate) -> Result<Vec<CouponNeedingUpdate>, JobError> {
        tokio::time::timeout(self.pass_timeout, preview_status_update(&self.db, today))
            .await
            .map_err(|_| JobError::Timeout(self.pass_timeout))?
    }
}
