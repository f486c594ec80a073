//! Coordination primitives for cache population
//!
//! ## Submodules
//!
//! - **`key_lock`**: per-key lock records with a global exclusive mode,
//!   staleness takeover and periodic cleanup
//! - **`dedup`**: per-category in-flight bags that collapse concurrent fetches
//!   for the same id
//!
//! Both primitives poll instead of parking and never fail on timeout: a
//! holder older than the configured ceiling is assumed to have leaked its
//! release and is taken over.

pub mod dedup;
pub mod key_lock;

pub use dedup::{FetchDeduplicator, InFlightBag, InFlightGuard};
pub use key_lock::{
    GlobalLockGuard, KeyLockGuard, KeyLockManager, LockConfig, DEFAULT_POLL_INTERVAL,
    DEFAULT_STALENESS_CEILING,
};
