use std::collections::{BTreeMap, BTreeSet};

use oddsfeed_domain::dto::{CategoryDto, SportEntryDto};
use oddsfeed_domain::{DtoPayload, Language, Urn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::merge::{CultureMerge, DataSource, LanguageTracker, LocalizedText};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportData {
    pub names: LocalizedText,
    pub category_ids: BTreeSet<Urn>,
    pub loaded: LanguageTracker,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    pub names: LocalizedText,
    pub sport_id: Option<Urn>,
    pub country_code: Option<String>,
    pub tournament_ids: BTreeSet<Urn>,
    pub loaded: LanguageTracker,
}

impl CategoryData {
    fn apply(&mut self, category: &CategoryDto, language: &Language) {
        self.names.set(language, category.name.as_str());
        self.sport_id = Some(category.sport_id.clone());
        if category.country_code.is_some() {
            self.country_code = category.country_code.clone();
        }
    }
}

/// Cached sport
///
/// Loaded for a language once the full sport list arrived in it.
#[derive(Debug)]
pub struct SportCacheItem {
    id: Urn,
    data: RwLock<SportData>,
}

impl SportCacheItem {
    pub fn new(id: Urn) -> Self {
        Self::from_data(id, SportData::default())
    }

    pub fn from_data(id: Urn, data: SportData) -> Self {
        Self { id, data: RwLock::new(data) }
    }

    pub fn id(&self) -> &Urn {
        &self.id
    }

    pub fn snapshot(&self) -> SportData {
        self.data.read().clone()
    }

    pub fn name(&self, language: &Language) -> Option<String> {
        self.data.read().names.get(language).map(str::to_string)
    }

    pub fn names(&self, wanted: &[Language]) -> BTreeMap<Language, String> {
        self.data.read().names.subset(wanted)
    }

    pub fn category_ids(&self) -> Vec<Urn> {
        self.data.read().category_ids.iter().cloned().collect()
    }

    fn merge_entry(&self, entry: &SportEntryDto, language: &Language) {
        let mut data = self.data.write();
        data.names.set(language, entry.sport.name.as_str());
        data.category_ids.extend(entry.categories.iter().map(|c| c.id.clone()));
        data.loaded.mark(DataSource::Summary, language);
    }
}

impl CultureMerge for SportCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        match payload {
            DtoPayload::SportList(list) => {
                match list.sports.iter().find(|entry| entry.sport.id == self.id) {
                    Some(entry) => {
                        self.merge_entry(entry, language);
                        true
                    }
                    None => false,
                }
            }
            DtoPayload::Sport(sport) if sport.id == self.id => {
                let mut data = self.data.write();
                data.names.set(language, sport.name.as_str());
                data.loaded.mark(DataSource::Referenced, language);
                true
            }
            DtoPayload::Category(category) if category.sport_id == self.id => {
                self.data.write().category_ids.insert(category.id.clone());
                true
            }
            DtoPayload::Tournament(tournament) if tournament.sport.id == self.id => {
                let mut data = self.data.write();
                data.names.set(language, tournament.sport.name.as_str());
                data.category_ids.insert(tournament.category.id.clone());
                data.loaded.mark(DataSource::Referenced, language);
                true
            }
            DtoPayload::TournamentInfo(info) if info.tournament.sport.id == self.id => {
                let mut data = self.data.write();
                data.names.set(language, info.tournament.sport.name.as_str());
                data.category_ids.insert(info.tournament.category.id.clone());
                data.loaded.mark(DataSource::Referenced, language);
                true
            }
            _ => false,
        }
    }

    fn loaded_languages(&self) -> BTreeSet<Language> {
        self.data.read().loaded.loaded(DataSource::Summary)
    }
}

/// Cached category
#[derive(Debug)]
pub struct CategoryCacheItem {
    id: Urn,
    data: RwLock<CategoryData>,
}

impl CategoryCacheItem {
    pub fn new(id: Urn) -> Self {
        Self::from_data(id, CategoryData::default())
    }

    pub fn from_data(id: Urn, data: CategoryData) -> Self {
        Self { id, data: RwLock::new(data) }
    }

    pub fn id(&self) -> &Urn {
        &self.id
    }

    pub fn snapshot(&self) -> CategoryData {
        self.data.read().clone()
    }

    pub fn name(&self, language: &Language) -> Option<String> {
        self.data.read().names.get(language).map(str::to_string)
    }

    pub fn names(&self, wanted: &[Language]) -> BTreeMap<Language, String> {
        self.data.read().names.subset(wanted)
    }

    pub fn sport_id(&self) -> Option<Urn> {
        self.data.read().sport_id.clone()
    }

    pub fn tournament_ids(&self) -> Vec<Urn> {
        self.data.read().tournament_ids.iter().cloned().collect()
    }

    fn merge_category(&self, category: &CategoryDto, source: DataSource, language: &Language) {
        let mut data = self.data.write();
        data.apply(category, language);
        data.loaded.mark(source, language);
    }
}

impl CultureMerge for CategoryCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        match payload {
            DtoPayload::SportList(list) => {
                let category = list
                    .sports
                    .iter()
                    .flat_map(|entry| entry.categories.iter())
                    .find(|category| category.id == self.id);
                match category {
                    Some(category) => {
                        self.merge_category(category, DataSource::Summary, language);
                        true
                    }
                    None => false,
                }
            }
            DtoPayload::Category(category) if category.id == self.id => {
                self.merge_category(category, DataSource::Referenced, language);
                true
            }
            DtoPayload::Tournament(tournament) if tournament.category.id == self.id => {
                self.merge_category(&tournament.category, DataSource::Referenced, language);
                self.data.write().tournament_ids.insert(tournament.id.clone());
                true
            }
            DtoPayload::TournamentInfo(info) if info.tournament.category.id == self.id => {
                self.merge_category(&info.tournament.category, DataSource::Referenced, language);
                self.data.write().tournament_ids.insert(info.tournament.id.clone());
                true
            }
            _ => false,
        }
    }

    fn loaded_languages(&self) -> BTreeSet<Language> {
        self.data.read().loaded.loaded(DataSource::Summary)
    }
}
