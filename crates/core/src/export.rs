//! Snapshot items for export and import
//!
//! Snapshots carry the full item state, including loaded-language markers,
//! so an imported item answers `has_translations_for` exactly like the
//! exported one.

use oddsfeed_domain::{CacheItemType, Language, Urn};
use serde::{Deserialize, Serialize};

use crate::items::{
    CategoryData, CompetitorData, MarketDescriptionData, PlayerData, SportData, SportEventData,
    VariantDescriptionData,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportableItem {
    SportEvent { id: Urn, data: SportEventData },
    Competitor { id: Urn, data: CompetitorData },
    Player { id: Urn, data: PlayerData },
    Sport { id: Urn, data: SportData },
    Category { id: Urn, data: CategoryData },
    /// Invariant (`variant` unset) or variant-specific market description
    MarketDescription { key: String, data: MarketDescriptionData },
    VariantDescription { id: String, data: VariantDescriptionData },
    /// Languages for which `cache` holds its whole reference list
    LoadedLanguages { cache: String, languages: Vec<Language> },
}

impl ExportableItem {
    pub fn item_type(&self) -> CacheItemType {
        match self {
            Self::SportEvent { .. } => CacheItemType::SportEvent,
            Self::Competitor { .. } => CacheItemType::Competitor,
            Self::Player { .. } => CacheItemType::Player,
            Self::Sport { .. } => CacheItemType::Sport,
            Self::Category { .. } => CacheItemType::Category,
            Self::MarketDescription { .. } => CacheItemType::MarketDescription,
            Self::VariantDescription { .. } => CacheItemType::VariantDescription,
            Self::LoadedLanguages { .. } => CacheItemType::All,
        }
    }

    /// Whether a cache named `cache` handling `item_types` restores this item
    pub fn is_owned_by(&self, cache: &str, item_types: &[CacheItemType]) -> bool {
        match self {
            Self::LoadedLanguages { cache: owner, .. } => owner == cache,
            other => item_types.contains(&other.item_type()),
        }
    }

    /// Store key of the item
    pub fn key(&self) -> String {
        match self {
            Self::SportEvent { id, .. }
            | Self::Competitor { id, .. }
            | Self::Player { id, .. }
            | Self::Sport { id, .. }
            | Self::Category { id, .. } => id.to_string(),
            Self::MarketDescription { key, .. } => key.clone(),
            Self::VariantDescription { id, .. } => id.clone(),
            Self::LoadedLanguages { cache, .. } => format!("{cache}.languages"),
        }
    }
}
