use std::collections::{BTreeMap, BTreeSet};

use oddsfeed_domain::dto::{
    MarketDescriptionDto, OutcomeDescriptionDto, SpecifierDto, VariantDescriptionDto,
};
use oddsfeed_domain::{DtoPayload, Language};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::merge::{CultureMerge, DataSource, LanguageTracker, LocalizedText};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeData {
    pub names: LocalizedText,
    pub descriptions: LocalizedText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptionData {
    pub id: u32,
    /// Set for variant-specific descriptions only
    pub variant: Option<String>,
    pub names: LocalizedText,
    pub descriptions: LocalizedText,
    pub outcomes: BTreeMap<String, OutcomeData>,
    pub specifiers: Vec<SpecifierDto>,
    pub groups: Vec<String>,
    pub loaded: LanguageTracker,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptionData {
    pub outcomes: BTreeMap<String, OutcomeData>,
    pub loaded: LanguageTracker,
}

fn merge_outcomes(
    target: &mut BTreeMap<String, OutcomeData>,
    outcomes: &[OutcomeDescriptionDto],
    language: &Language,
) {
    for outcome in outcomes {
        let entry = target.entry(outcome.id.clone()).or_default();
        entry.names.set(language, outcome.name.as_str());
        entry.descriptions.set_opt(language, outcome.description.as_deref());
    }
}

fn outcome_names(
    outcomes: &BTreeMap<String, OutcomeData>,
    language: &Language,
) -> BTreeMap<String, String> {
    outcomes
        .iter()
        .filter_map(|(id, outcome)| {
            outcome.names.get(language).map(|name| (id.clone(), name.to_string()))
        })
        .collect()
}

/// Cached market description (invariant or variant specific)
#[derive(Debug)]
pub struct MarketDescriptionCacheItem {
    data: RwLock<MarketDescriptionData>,
}

impl MarketDescriptionCacheItem {
    pub fn new(id: u32, variant: Option<String>) -> Self {
        Self::from_data(MarketDescriptionData { id, variant, ..Default::default() })
    }

    pub fn from_data(data: MarketDescriptionData) -> Self {
        Self { data: RwLock::new(data) }
    }

    pub fn id(&self) -> u32 {
        self.data.read().id
    }

    pub fn variant(&self) -> Option<String> {
        self.data.read().variant.clone()
    }

    pub fn snapshot(&self) -> MarketDescriptionData {
        self.data.read().clone()
    }

    pub fn name(&self, language: &Language) -> Option<String> {
        self.data.read().names.get(language).map(str::to_string)
    }

    /// Outcome id to outcome name in `language`
    pub fn outcome_names(&self, language: &Language) -> BTreeMap<String, String> {
        outcome_names(&self.data.read().outcomes, language)
    }

    fn merge_description(&self, market: &MarketDescriptionDto, language: &Language) {
        let mut data = self.data.write();
        data.names.set(language, market.name.as_str());
        data.descriptions.set_opt(language, market.description.as_deref());
        merge_outcomes(&mut data.outcomes, &market.outcomes, language);
        if !market.specifiers.is_empty() {
            data.specifiers = market.specifiers.clone();
        }
        if !market.groups.is_empty() {
            data.groups = market.groups.clone();
        }
        data.loaded.mark(DataSource::Descriptions, language);
    }

    fn matches(&self, market: &MarketDescriptionDto) -> bool {
        let data = self.data.read();
        data.id == market.id && data.variant == market.variant
    }
}

impl CultureMerge for MarketDescriptionCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        let market = match payload {
            DtoPayload::MarketDescriptionList(list) => {
                list.markets.iter().find(|market| self.matches(market))
            }
            DtoPayload::VariantMarketDescription(market) if self.matches(market) => Some(market),
            _ => None,
        };
        match market {
            Some(market) => {
                self.merge_description(market, language);
                true
            }
            None => false,
        }
    }

    fn loaded_languages(&self) -> BTreeSet<Language> {
        self.data.read().loaded.loaded(DataSource::Descriptions)
    }
}

/// Cached outcome set of a variant
#[derive(Debug)]
pub struct VariantDescriptionCacheItem {
    id: String,
    data: RwLock<VariantDescriptionData>,
}

impl VariantDescriptionCacheItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_data(id, VariantDescriptionData::default())
    }

    pub fn from_data(id: impl Into<String>, data: VariantDescriptionData) -> Self {
        Self { id: id.into(), data: RwLock::new(data) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> VariantDescriptionData {
        self.data.read().clone()
    }

    pub fn outcome_names(&self, language: &Language) -> BTreeMap<String, String> {
        outcome_names(&self.data.read().outcomes, language)
    }

    fn merge_variant(&self, variant: &VariantDescriptionDto, language: &Language) {
        let mut data = self.data.write();
        merge_outcomes(&mut data.outcomes, &variant.outcomes, language);
        data.loaded.mark(DataSource::Descriptions, language);
    }
}

impl CultureMerge for VariantDescriptionCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        let DtoPayload::VariantDescriptionList(list) = payload else {
            return false;
        };
        match list.variants.iter().find(|variant| variant.id == self.id) {
            Some(variant) => {
                self.merge_variant(variant, language);
                true
            }
            None => false,
        }
    }

    fn loaded_languages(&self) -> BTreeSet<Language> {
        self.data.read().loaded.loaded(DataSource::Descriptions)
    }
}

#[cfg(test)]
mod tests {
    use oddsfeed_domain::dto::{MarketDescriptionListDto, VariantDescriptionListDto};

    use super::*;

    fn lang(code: &str) -> Language {
        Language::new(code).unwrap()
    }

    fn market(name: &str, home: &str) -> MarketDescriptionDto {
        MarketDescriptionDto::new(1, name).with_outcomes(vec![
            OutcomeDescriptionDto::new("1", home),
            OutcomeDescriptionDto::new("2", "X"),
        ])
    }

    #[test]
    fn test_outcomes_merge_per_language() {
        let item = MarketDescriptionCacheItem::new(1, None);
        let en = DtoPayload::MarketDescriptionList(MarketDescriptionListDto {
            markets: vec![market("1x2", "Home")],
        });
        let de = DtoPayload::MarketDescriptionList(MarketDescriptionListDto {
            markets: vec![market("1x2", "Heim")],
        });

        assert!(item.merge_dto(&en, &lang("en")));
        assert!(item.merge_dto(&de, &lang("de")));
        assert_eq!(item.outcome_names(&lang("de")).get("1").map(String::as_str), Some("Heim"));
        assert_eq!(item.outcome_names(&lang("en")).get("1").map(String::as_str), Some("Home"));
        assert!(item.has_translations_for(&[lang("en"), lang("de")]));
    }

    #[test]
    fn test_variant_item_ignores_invariant_description() {
        let item = MarketDescriptionCacheItem::new(1, Some("sr:exact_goals:5+".to_string()));
        let invariant = DtoPayload::VariantMarketDescription(market("1x2", "Home"));
        assert!(!item.merge_dto(&invariant, &lang("en")));

        let mut variant = market("Exact goals", "0");
        variant.variant = Some("sr:exact_goals:5+".to_string());
        assert!(item.merge_dto(&DtoPayload::VariantMarketDescription(variant), &lang("en")));
    }

    #[test]
    fn test_variant_description_merge() {
        let item = VariantDescriptionCacheItem::new("sr:correct_score:max:6");
        let list = VariantDescriptionListDto {
            variants: vec![VariantDescriptionDto {
                id: "sr:correct_score:max:6".to_string(),
                outcomes: vec![OutcomeDescriptionDto::new("110", "1:0")],
            }],
        };

        assert!(item.merge_dto(&DtoPayload::VariantDescriptionList(list), &lang("en")));
        assert_eq!(item.outcome_names(&lang("en")).len(), 1);
    }
}
