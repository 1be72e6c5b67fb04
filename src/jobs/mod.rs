//! Scheduled Jobs
//!
//! Background maintenance that runs beside request handling and shares only
//! the storage with it: the visibility sweep and reference reconciliation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::repository::{AggregateRepository, ReconcileReport, RepositoryError};

/// Upper bound for a single tick, whatever the interval
const MAX_TICK_TIMEOUT: Duration = Duration::from_secs(300);

// =========================================================================
// Visibility Sweep
// =========================================================================

/// Hide every public exhibition whose end date has passed
///
/// Exhibitions are never made public again when their start date arrives;
/// publishing stays an explicit act.
pub async fn hide_ended_exhibitions(repository: &AggregateRepository) -> Result<u64, JobError> {
    let modified = repository.hide_ended().await?;

    tracing::info!(
        modified = modified,
        timezone = %repository.clock().timezone(),
        "Visibility sweep finished"
    );

    Ok(modified)
}

// =========================================================================
// Reconciliation
// =========================================================================

/// Delete orphaned children and prune dangling child references
pub async fn reconcile_references(
    repository: &AggregateRepository,
) -> Result<ReconcileReport, JobError> {
    let report = repository.reconcile().await?;

    if report.failures > 0 {
        tracing::warn!(failures = report.failures, "Reconciliation left drift behind");
    }

    Ok(report)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the visibility sweep (default: 1 hour)
    pub sweep_interval: Duration,
    /// Interval for reconciliation (default: 6 hours)
    pub reconcile_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600),
            reconcile_interval: Duration::from_secs(21600),
        }
    }
}

/// Deadline for one tick: half the interval, capped, so ticks never overlap
pub fn tick_timeout(every: Duration) -> Duration {
    (every / 2).min(MAX_TICK_TIMEOUT)
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    repository: AggregateRepository,
    config: JobSchedulerConfig,
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for the current tick to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Job scheduler task failed");
        }
    }
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(repository: AggregateRepository) -> Self {
        Self {
            repository,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(repository: AggregateRepository, config: JobSchedulerConfig) -> Self {
        Self { repository, config }
    }

    /// Start the job scheduler in the background
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(receiver).await;
        });
        SchedulerHandle { shutdown, task }
    }

    /// Run the scheduler loop until shutdown is signalled
    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            sweep_interval = ?self.config.sweep_interval,
            reconcile_interval = ?self.config.reconcile_interval,
            "Job scheduler started"
        );

        let mut sweep_interval = interval(self.config.sweep_interval);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reconcile_interval = interval(self.config.reconcile_interval);
        reconcile_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = sweep_interval.tick() => {
                    if let Err(e) = self.sweep_tick().await {
                        tracing::error!(error = %e, "Visibility sweep failed");
                    }
                }
                _ = reconcile_interval.tick() => {
                    if let Err(e) = self.reconcile_tick().await {
                        tracing::error!(error = %e, "Reconciliation failed");
                    }
                }
            }
        }

        tracing::info!("Job scheduler stopped");
    }

    async fn sweep_tick(&self) -> Result<u64, JobError> {
        let limit = tick_timeout(self.config.sweep_interval);
        tokio::time::timeout(limit, hide_ended_exhibitions(&self.repository))
            .await
            .map_err(|_| JobError::Timeout(limit))?
    }

    async fn reconcile_tick(&self) -> Result<ReconcileReport, JobError> {
        let limit = tick_timeout(self.config.reconcile_interval);
        tokio::time::timeout(limit, reconcile_references(&self.repository))
            .await
            .map_err(|_| JobError::Timeout(limit))?
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match self.sweep_tick().await {
            Ok(count) => report.exhibitions_hidden = count,
            Err(e) => report.errors.push(format!("Visibility sweep: {}", e)),
        }

        match self.reconcile_tick().await {
            Ok(result) => report.reconcile = result,
            Err(e) => report.errors.push(format!("Reconciliation: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub exhibitions_hidden: u64,
    pub reconcile: ReconcileReport,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Job timed out after {0:?}")]
    Timeout(Duration),
}

// =========================================================================
// Tests
// =========================================================================
