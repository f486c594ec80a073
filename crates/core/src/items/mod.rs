//! Cache items
//!
//! One type per entity kind. Each item keeps its mutable state behind a
//! `parking_lot::RwLock` and is shared as `Arc<Item>` between the store and
//! in-flight fetches, so merges land on the same instance a caller holds.
//! The `*Data` structs are the plain, serialisable state used for snapshots.

mod competitor;
mod market;
mod player;
mod sport_data;
mod sport_event;
mod status;

pub use competitor::{CompetitorCacheItem, CompetitorData};
pub use market::{
    MarketDescriptionCacheItem, MarketDescriptionData, OutcomeData, VariantDescriptionCacheItem,
    VariantDescriptionData,
};
pub use player::{PlayerCacheItem, PlayerData};
pub use sport_data::{CategoryCacheItem, CategoryData, SportCacheItem, SportData};
pub use sport_event::{SportEventAttribute, SportEventCacheItem, SportEventData};
pub use status::SportEventStatusCacheItem;
