//! # Oddsfeed Core
//!
//! Entity cache coordination layer for the odds feed.
//!
//! This crate contains:
//! - The per-language merge engine and cache items
//! - Specialized caches (events, statuses, profiles, sport data, markets)
//! - The `CacheManager` that routes payloads to caches by `DtoType`
//! - Snapshot export/import and health reporting
//!
//! ## Architecture Principles
//! - Depends on `oddsfeed-common` primitives and `oddsfeed-domain` types
//! - No transport code: upstream data only through the `DataRouter` port
//! - Every wait is bounded by the configured staleness ceiling

pub mod caches;
pub mod export;
pub mod health;
pub mod items;
pub mod manager;
pub mod merge;

// Upstream port
pub mod data_router_ports;

pub use caches::{
    CacheDeps, InvariantMarketCache, ProfileCache, SportDataCache, SportEventCache,
    SportEventStatusCache, VariantDescriptionCache, VariantMarketCache,
};
pub use data_router_ports::{DataRouter, FetchResult};
pub use export::ExportableItem;
pub use health::{CacheHealth, ManagerHealth};
pub use manager::{
    CacheManager, DispatchReport, DtoEnvelope, RefreshJob, Requester, SpecializedCache,
};
pub use merge::{CultureMerge, DataSource, LanguageTracker, LocalizedText};
