//! Expiring key/value store used by every entity cache
//!
//! # Features
//!
//! - **Thread-safe**: lock-free reads, one index mutex per store for writes
//! - **Per-entry expiration**: absolute deadline and/or sliding window with
//!   jitter, captured when the entry is added
//! - **Pinned entries**: `EvictionPriority::NeverRemove` for small fixed
//!   reference sets
//! - **Consistent key index**: `keys()` equals the set of retrievable keys
//! - **Metrics tracking**: hit/miss/insert/eviction/expiration counters
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
//!
//! let config = StoreConfig::builder("profiles")
//!     .sliding_ttl(Duration::from_secs(24 * 3600))
//!     .sliding_jitter(Duration::from_secs(3600))
//!     .build();
//! let store: ExpiringStore<u32> = ExpiringStore::new(config);
//!
//! store.add("sr:competitor:1", 1, EvictionPriority::Normal);
//! store.add_optional("sr:competitor:2", None, EvictionPriority::Normal);
//! assert_eq!(store.count(), 1);
//! ```

mod config;
mod stats;
mod store;

// Re-export public API
pub use config::{EvictionPriority, StoreConfig, StoreConfigBuilder};
pub use stats::CacheStats;
pub use store::{ExpirationPolicy, ExpiringStore};
