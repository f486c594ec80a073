//! Background work for the caches
//!
//! The refresh scheduler re-fetches reference data (sports, market and
//! variant descriptions) in every configured language and periodically
//! drops stale per-key lock records. It goes through the same fetch slots
//! and key locks as foreground callers.

pub mod error;
pub mod refresh_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use refresh_scheduler::{RefreshReport, RefreshScheduler, RefreshSchedulerConfig};
