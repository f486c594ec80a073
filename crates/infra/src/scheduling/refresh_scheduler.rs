//! Interval-driven refresh of reference data
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oddsfeed_core::CacheManager;
//! use oddsfeed_infra::scheduling::{RefreshScheduler, RefreshSchedulerConfig};
//!
//! # async fn example() -> Result<(), oddsfeed_infra::scheduling::SchedulerError> {
//! let manager = Arc::new(CacheManager::new());
//! let mut scheduler = RefreshScheduler::new(manager, RefreshSchedulerConfig::default());
//! // scheduler.register_job(sport_data_cache)?;
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use oddsfeed_common::log_by_severity;
use oddsfeed_core::{CacheManager, RefreshJob};
use oddsfeed_domain::CacheSettings;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Period between two refreshes of every registered job
    pub refresh_interval: Duration,
    /// Period between two stale-lock sweeps
    pub clean_interval: Duration,
    /// Upper bound for one job's refresh
    pub job_timeout: Duration,
}

impl RefreshSchedulerConfig {
    /// Reject zero periods; `tokio::time::interval` panics on them
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> SchedulerResult<()> {
        for (field, value) in [
            ("refresh_interval", self.refresh_interval),
            ("clean_interval", self.clean_interval),
            ("job_timeout", self.job_timeout),
        ] {
            if value.is_zero() {
                return Err(SchedulerError::InvalidConfig(format!("{field} must be > 0")));
            }
        }
        Ok(())
    }
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60 * 60),
            clean_interval: Duration::from_secs(60),
            job_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&CacheSettings> for RefreshSchedulerConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            refresh_interval: settings.refresh.interval,
            clean_interval: settings.locking.clean_interval,
            ..Self::default()
        }
    }
}

/// Outcome of one refresh round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<String>,
}

pub struct RefreshScheduler {
    manager: Arc<CacheManager>,
    jobs: Vec<Arc<dyn RefreshJob>>,
    config: RefreshSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl RefreshScheduler {
    pub fn new(manager: Arc<CacheManager>, config: RefreshSchedulerConfig) -> Self {
        Self {
            manager,
            jobs: Vec::new(),
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Add a job to every future refresh round
    ///
    /// # Errors
    ///
    /// `JobRegistrationFailed` while running or when a job of the same name
    /// is registered already.
    pub fn register_job(&mut self, job: Arc<dyn RefreshJob>) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::JobRegistrationFailed(format!(
                "{}: scheduler is running",
                job.name()
            )));
        }
        if self.jobs.iter().any(|existing| existing.name() == job.name()) {
            return Err(SchedulerError::JobRegistrationFailed(format!(
                "{}: already registered",
                job.name()
            )));
        }
        debug!(job = job.name(), "refresh job registered");
        self.jobs.push(job);
        Ok(())
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.name().to_string()).collect()
    }

    /// Spawn the background loop
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if started twice; `InvalidConfig` for a zero period.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        self.config.validate()?;

        // A fresh token allows restart after stop
        self.cancellation_token = CancellationToken::new();

        let jobs = self.jobs.clone();
        let manager = Arc::clone(&self.manager);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::refresh_loop(jobs, manager, config, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(
            jobs = self.jobs.len(),
            refresh_interval_ms = self.config.refresh_interval.as_millis() as u64,
            "refresh scheduler started"
        );
        Ok(())
    }

    /// Cancel the loop and wait for it to finish
    ///
    /// # Errors
    ///
    /// `NotRunning` if not started; `Timeout` or `TaskJoinFailed` if the loop
    /// does not wind down cleanly.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(STOP_TIMEOUT, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { duration: STOP_TIMEOUT })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("refresh scheduler stopped");
        Ok(())
    }

    /// Whether the loop task is alive
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run every job once, now
    pub async fn run_once(&self) -> RefreshReport {
        Self::refresh_all(&self.jobs, self.config.job_timeout).await
    }

    async fn refresh_loop(
        jobs: Vec<Arc<dyn RefreshJob>>,
        manager: Arc<CacheManager>,
        config: RefreshSchedulerConfig,
        cancel: CancellationToken,
    ) {
        let start = tokio::time::Instant::now();
        let mut refresh_tick = interval_at(start + config.refresh_interval, config.refresh_interval);
        refresh_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut clean_tick = interval_at(start + config.clean_interval, config.clean_interval);
        clean_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("refresh loop cancelled");
                    break;
                }
                _ = refresh_tick.tick() => {
                    let report = Self::refresh_all(&jobs, config.job_timeout).await;
                    if !report.failed.is_empty() {
                        warn!(failed = ?report.failed, "refresh round finished with failures");
                    }
                }
                _ = clean_tick.tick() => {
                    let removed = manager.clean_locks();
                    if removed > 0 {
                        debug!(removed, "stale lock records dropped");
                    }
                }
            }
        }
    }

    async fn refresh_all(jobs: &[Arc<dyn RefreshJob>], job_timeout: Duration) -> RefreshReport {
        let mut report = RefreshReport::default();
        for job in jobs {
            let started = Instant::now();
            match tokio::time::timeout(job_timeout, job.refresh()).await {
                Ok(Ok(())) => {
                    debug!(
                        job = job.name(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "refresh job finished"
                    );
                    report.refreshed.push(job.name().to_string());
                }
                Ok(Err(err)) => {
                    log_by_severity!(&err, job = job.name(), error = %err, "refresh job failed");
                    report.failed.push(job.name().to_string());
                }
                Err(_) => {
                    error!(job = job.name(), timeout_ms = job_timeout.as_millis() as u64, "refresh job timed out");
                    report.failed.push(job.name().to_string());
                }
            }
        }
        report
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() && self.is_running() {
            warn!("RefreshScheduler dropped while running; cancelling");
        }
        self.cancellation_token.cancel();
    }
}
