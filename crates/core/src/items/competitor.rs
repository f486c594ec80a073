use std::collections::BTreeSet;

use oddsfeed_domain::dto::CompetitorDto;
use oddsfeed_domain::{DtoPayload, Language, Urn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::merge::{CultureMerge, DataSource, LanguageTracker, LocalizedText};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorData {
    pub names: LocalizedText,
    pub countries: LocalizedText,
    pub abbreviations: LocalizedText,
    pub venue_names: LocalizedText,
    pub country_code: Option<String>,
    pub player_ids: Vec<Urn>,
    /// Last event this competitor was seen in (lookup only)
    pub associated_event_id: Option<Urn>,
    pub loaded: LanguageTracker,
}

impl CompetitorData {
    fn apply(&mut self, competitor: &CompetitorDto, language: &Language) {
        self.names.set(language, competitor.name.as_str());
        self.countries.set_opt(language, competitor.country.as_deref());
        self.abbreviations.set_opt(language, competitor.abbreviation.as_deref());
        if competitor.country_code.is_some() {
            self.country_code = competitor.country_code.clone();
        }
    }
}

/// Cached competitor (team or individual)
///
/// Counts as loaded for a language once its profile was fetched in it;
/// names seen in event payloads are kept but tracked as referenced only.
#[derive(Debug)]
pub struct CompetitorCacheItem {
    id: Urn,
    data: RwLock<CompetitorData>,
}

impl CompetitorCacheItem {
    pub fn new(id: Urn) -> Self {
        Self::from_data(id, CompetitorData::default())
    }

    pub fn from_data(id: Urn, data: CompetitorData) -> Self {
        Self { id, data: RwLock::new(data) }
    }

    pub fn id(&self) -> &Urn {
        &self.id
    }

    pub fn snapshot(&self) -> CompetitorData {
        self.data.read().clone()
    }

    pub fn name(&self, language: &Language) -> Option<String> {
        self.data.read().names.get(language).map(str::to_string)
    }

    pub fn names(&self, wanted: &[Language]) -> std::collections::BTreeMap<Language, String> {
        self.data.read().names.subset(wanted)
    }

    /// Whether a name is known for every wanted language, from any source
    pub fn has_names_for(&self, wanted: &[Language]) -> bool {
        let data = self.data.read();
        wanted.iter().all(|language| data.names.contains(language))
    }

    pub fn player_ids(&self) -> Vec<Urn> {
        self.data.read().player_ids.clone()
    }

    pub fn associated_event_id(&self) -> Option<Urn> {
        self.data.read().associated_event_id.clone()
    }

    fn merge_referenced<'a>(
        &self,
        competitors: impl IntoIterator<Item = &'a CompetitorDto>,
        event_id: Option<&Urn>,
        language: &Language,
    ) -> bool {
        let Some(competitor) = competitors.into_iter().find(|c| c.id == self.id) else {
            return false;
        };
        let mut data = self.data.write();
        data.apply(competitor, language);
        if let Some(event_id) = event_id {
            data.associated_event_id = Some(event_id.clone());
        }
        data.loaded.mark(DataSource::Referenced, language);
        true
    }
}

impl CultureMerge for CompetitorCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        match payload {
            DtoPayload::CompetitorProfile(profile) if profile.competitor.id == self.id => {
                let mut data = self.data.write();
                data.apply(&profile.competitor, language);
                data.player_ids = profile.players.iter().map(|p| p.id.clone()).collect();
                if let Some(venue) = &profile.venue {
                    data.venue_names.set(language, venue.name.as_str());
                }
                data.loaded.mark(DataSource::Profile, language);
                true
            }
            DtoPayload::Competitor(competitor) => {
                self.merge_referenced(std::iter::once(competitor), None, language)
            }
            DtoPayload::SportEventSummary(summary) | DtoPayload::MatchSummary(summary) => {
                self.merge_referenced(&summary.competitors, Some(&summary.id), language)
            }
            DtoPayload::Fixture(fixture) => self.merge_referenced(
                &fixture.event.competitors,
                Some(&fixture.event.id),
                language,
            ),
            DtoPayload::TournamentInfo(info) => {
                self.merge_referenced(&info.competitors, None, language)
            }
            _ => false,
        }
    }

    fn loaded_languages(&self) -> BTreeSet<Language> {
        self.data.read().loaded.loaded(DataSource::Profile)
    }
}

#[cfg(test)]
mod tests {
    use oddsfeed_domain::dto::{CompetitorProfileDto, PlayerDto, SportEventSummaryDto};

    use super::*;

    fn urn(s: &str) -> Urn {
        s.parse().unwrap()
    }

    fn lang(code: &str) -> Language {
        Language::new(code).unwrap()
    }

    #[test]
    fn test_profile_marks_loaded() {
        let item = CompetitorCacheItem::new(urn("sr:competitor:1"));
        let profile = CompetitorProfileDto::new(
            CompetitorDto::new(urn("sr:competitor:1"), "Team A"),
            vec![PlayerDto::new(urn("sr:player:10"), "Doe, John")],
        );

        assert!(item.merge_dto(&DtoPayload::CompetitorProfile(profile), &lang("en")));
        assert!(item.has_translations_for(&[lang("en")]));
        assert_eq!(item.player_ids(), vec![urn("sr:player:10")]);
    }

    #[test]
    fn test_event_reference_names_without_loading() {
        let item = CompetitorCacheItem::new(urn("sr:competitor:2"));
        let mut summary = SportEventSummaryDto::new(urn("sr:match:5"), "A vs B");
        summary.competitors = vec![
            CompetitorDto::new(urn("sr:competitor:1"), "A"),
            CompetitorDto::new(urn("sr:competitor:2"), "B"),
        ];

        assert!(item.merge_dto(&DtoPayload::MatchSummary(summary), &lang("en")));
        assert_eq!(item.name(&lang("en")).as_deref(), Some("B"));
        assert!(item.has_names_for(&[lang("en")]));
        assert!(!item.has_translations_for(&[lang("en")]));
        assert_eq!(item.associated_event_id(), Some(urn("sr:match:5")));
    }

    /// Validates that concurrent merges of disjoint languages are not lost.
    ///
    /// Assertions:
    /// - Confirms every language from both threads ends up loaded.
    #[test]
    fn test_concurrent_language_merges() {
        let item = std::sync::Arc::new(CompetitorCacheItem::new(urn("sr:competitor:1")));
        let handles: Vec<_> = ["en", "de", "fr", "it", "es", "nl"]
            .into_iter()
            .map(|code| {
                let item = std::sync::Arc::clone(&item);
                std::thread::spawn(move || {
                    let profile = CompetitorProfileDto::new(
                        CompetitorDto::new(urn("sr:competitor:1"), format!("Team {code}")),
                        Vec::new(),
                    );
                    item.merge_dto(&DtoPayload::CompetitorProfile(profile), &lang(code));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(item.loaded_languages().len(), 6);
        assert_eq!(item.name(&lang("fr")).as_deref(), Some("Team fr"));
    }
}
