//! Scheduler error types

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    /// A tick period or timeout that the loop cannot run with
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// Jobs can only be registered while the scheduler is stopped
    #[error("Failed to register job: {0}")]
    JobRegistrationFailed(String),

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
