//! Specialized caches registered with the [`CacheManager`](crate::CacheManager)
//!
//! Every cache follows the same pattern:
//! - a fast path that answers from the store without suspending
//! - a fetch path that claims an in-flight slot, re-checks the missing
//!   languages and fetches them concurrently
//! - fetched payloads go through the manager, so every interested cache
//!   merges them under its own per-key lock

mod market;
mod profile;
mod sport_data;
mod sport_event;
mod status;
mod support;

pub use market::{
    variant_market_key, InvariantMarketCache, VariantDescriptionCache, VariantMarketCache,
    MARKET_LIST_ID, VARIANT_LIST_ID,
};
pub use profile::ProfileCache;
pub use sport_data::{SportDataCache, SPORT_LIST_ID};
pub use sport_event::SportEventCache;
pub use status::SportEventStatusCache;
pub use support::CacheDeps;
