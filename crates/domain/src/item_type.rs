//! Cache item kinds used to target invalidation

use serde::{Deserialize, Serialize};

use crate::impl_domain_tag_conversions;

/// Kind of entity a cache holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheItemType {
    /// Wildcard matching every kind
    All,
    Sport,
    Category,
    SportEvent,
    Competitor,
    Player,
    MarketDescription,
    VariantDescription,
}

impl_domain_tag_conversions!(CacheItemType {
    All => "all",
    Sport => "sport",
    Category => "category",
    SportEvent => "sport_event",
    Competitor => "competitor",
    Player => "player",
    MarketDescription => "market_description",
    VariantDescription => "variant_description",
});

impl CacheItemType {
    /// Whether an invalidation for `self` applies to a cache handling `other`
    pub fn matches(self, other: CacheItemType) -> bool {
        self == Self::All || other == Self::All || self == other
    }
}
