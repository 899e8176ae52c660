//! Background jobs
//!
//! Every tick: shifts are moved along with the clock and lapsed customer
//! warranties are expired.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::repositories::shift_repository::ShiftRepository;
use crate::repositories::warranty_repository::WarrantyRepository;
use crate::services::metrics::Metrics;
use crate::utils::errors::AppResult;

pub const JOB_SHIFTS: &str = "shift_reconciliation";
pub const JOB_WARRANTY: &str = "warranty_expiry";

#[derive(Clone)]
pub struct Scheduler {
    pool: PgPool,
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pool: PgPool, metrics: Arc<Metrics>, interval_secs: u64) -> Self {
        Self {
            pool,
            metrics,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        info!("⏱️ Scheduler started (every {:?})", self.interval);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                self.run_once().await;
            }
        })
    }

    /// One pass over every job. A failing job does not stop the others.
    pub async fn run_once(&self) {
        match self.reconcile_shifts().await {
            Ok(changed) => self.record(JOB_SHIFTS, changed),
            Err(e) => error!("Shift reconciliation failed: {}", e),
        }
        match self.expire_warranties().await {
            Ok(changed) => self.record(JOB_WARRANTY, changed),
            Err(e) => error!("Warranty expiry failed: {}", e),
        }
    }

    async fn reconcile_shifts(&self) -> AppResult<u64> {
        let (started, completed) = ShiftRepository::new(self.pool.clone())
            .reconcile_all(Utc::now())
            .await?;
        if started + completed > 0 {
            info!(started, completed, "Shifts reconciled");
        }
        Ok(started + completed)
    }

    async fn expire_warranties(&self) -> AppResult<u64> {
        let expired = WarrantyRepository::new(self.pool.clone())
            .expire_before(Utc::now().date_naive())
            .await?;
        if expired > 0 {
            info!(expired, "Customer warranties expired");
        }
        Ok(expired)
    }

    fn record(&self, job: &str, changed: u64) {
        self.metrics.scheduler_runs.with_label_values(&[job]).inc();
        self.metrics
            .scheduler_rows_changed
            .with_label_values(&[job])
            .inc_by(changed);
    }
}
