use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use oddsfeed_domain::{DtoPayload, Language, Urn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::merge::{CultureMerge, DataSource, LanguageTracker, LocalizedText};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub names: LocalizedText,
    pub full_names: LocalizedText,
    pub nationalities: LocalizedText,
    pub date_of_birth: Option<NaiveDate>,
    pub position: Option<String>,
    pub jersey_number: Option<u32>,
    /// Competitor whose roster lists this player (lookup only)
    pub competitor_id: Option<Urn>,
    pub loaded: LanguageTracker,
}

/// Cached player
///
/// A language counts as loaded once a name arrived from either the player's
/// own profile or a competitor roster.
#[derive(Debug)]
pub struct PlayerCacheItem {
    id: Urn,
    data: RwLock<PlayerData>,
}

const NAME_SOURCES: &[DataSource] = &[DataSource::Profile, DataSource::Referenced];

impl PlayerCacheItem {
    pub fn new(id: Urn) -> Self {
        Self::from_data(id, PlayerData::default())
    }

    pub fn from_data(id: Urn, data: PlayerData) -> Self {
        Self { id, data: RwLock::new(data) }
    }

    pub fn id(&self) -> &Urn {
        &self.id
    }

    pub fn snapshot(&self) -> PlayerData {
        self.data.read().clone()
    }

    pub fn name(&self, language: &Language) -> Option<String> {
        self.data.read().names.get(language).map(str::to_string)
    }

    pub fn names(&self, wanted: &[Language]) -> BTreeMap<Language, String> {
        self.data.read().names.subset(wanted)
    }

    pub fn competitor_id(&self) -> Option<Urn> {
        self.data.read().competitor_id.clone()
    }

    pub fn set_competitor_id(&self, competitor_id: Urn) {
        self.data.write().competitor_id = Some(competitor_id);
    }

    /// Record that upstream has no profile in `language`.
    ///
    /// The language becomes loaded with an empty name unless a roster
    /// already supplied one, so it is not fetched again.
    pub fn mark_not_found(&self, language: &Language) {
        let mut data = self.data.write();
        data.names.ensure_present(language);
        data.loaded.mark(DataSource::Profile, language);
    }
}

impl CultureMerge for PlayerCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        match payload {
            DtoPayload::PlayerProfile(profile) if profile.id == self.id => {
                let mut data = self.data.write();
                data.names.set(language, profile.name.as_str());
                data.full_names.set_opt(language, profile.full_name.as_deref());
                data.nationalities.set_opt(language, profile.nationality.as_deref());
                if profile.date_of_birth.is_some() {
                    data.date_of_birth = profile.date_of_birth;
                }
                if profile.position.is_some() {
                    data.position = profile.position.clone();
                }
                if profile.competitor_id.is_some() {
                    data.competitor_id = profile.competitor_id.clone();
                }
                data.loaded.mark(DataSource::Profile, language);
                true
            }
            DtoPayload::CompetitorProfile(profile) => {
                let Some(player) = profile.players.iter().find(|p| p.id == self.id) else {
                    return false;
                };
                let mut data = self.data.write();
                data.names.set(language, player.name.as_str());
                if player.jersey_number.is_some() {
                    data.jersey_number = player.jersey_number;
                }
                if player.position.is_some() {
                    data.position = player.position.clone();
                }
                data.competitor_id = Some(profile.competitor.id.clone());
                data.loaded.mark(DataSource::Referenced, language);
                true
            }
            _ => false,
        }
    }

    fn loaded_languages(&self) -> BTreeSet<Language> {
        self.data.read().loaded.loaded_any(NAME_SOURCES)
    }
}
