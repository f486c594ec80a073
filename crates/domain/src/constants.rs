//! Domain constants
//!
//! Defaults for cache lifetimes, coordination timings and refresh cadence.

use std::time::Duration;

// Language defaults
pub const DEFAULT_LANGUAGE: &str = "en";

// Coordination
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(20);
pub const DEFAULT_LOCK_STALENESS_CEILING: Duration = Duration::from_secs(30);
pub const DEFAULT_DEDUP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOCK_CLEAN_INTERVAL: Duration = Duration::from_secs(60);

// Store lifetimes
pub const DEFAULT_SPORT_EVENT_TTL: Duration = Duration::from_secs(12 * 3600);
pub const DEFAULT_SPORT_EVENT_STATUS_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PROFILE_SLIDING_TTL: Duration = Duration::from_secs(24 * 3600);
pub const DEFAULT_PROFILE_SLIDING_JITTER: Duration = Duration::from_secs(3600);
pub const DEFAULT_VARIANT_MARKET_SLIDING_TTL: Duration = Duration::from_secs(3 * 3600);

// Background refresh
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 3600);

// Store names, used in logs and health reports
pub const SPORT_EVENT_CACHE_NAME: &str = "SportEventCache";
pub const SPORT_EVENT_STATUS_CACHE_NAME: &str = "SportEventStatusCache";
pub const PROFILE_CACHE_NAME: &str = "ProfileCache";
pub const SPORT_DATA_CACHE_NAME: &str = "SportDataCache";
pub const INVARIANT_MARKET_CACHE_NAME: &str = "InvariantMarketCache";
pub const VARIANT_MARKET_CACHE_NAME: &str = "VariantMarketCache";
pub const VARIANT_DESCRIPTION_CACHE_NAME: &str = "VariantDescriptionCache";
