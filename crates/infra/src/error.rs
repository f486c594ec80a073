//! Infrastructure error type
//!
//! Wraps the domain error so callers of the wiring layer handle one type,
//! and converts back into `CacheError` at the boundary.

use oddsfeed_domain::CacheError;
use thiserror::Error;

use crate::scheduling::SchedulerError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Telemetry setup failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

impl From<InfraError> for CacheError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Cache(inner) => inner,
            InfraError::Scheduler(inner) => CacheError::Config(inner.to_string()),
            InfraError::Telemetry(message) => CacheError::Config(message),
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_into_cache_error() {
        let err: InfraError = CacheError::Config("bad".to_string()).into();
        assert_eq!(CacheError::from(err), CacheError::Config("bad".to_string()));

        let err: InfraError = SchedulerError::AlreadyRunning.into();
        assert!(matches!(CacheError::from(err), CacheError::Config(message) if message.contains("already running")));
    }
}
