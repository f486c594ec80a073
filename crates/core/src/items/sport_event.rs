use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use oddsfeed_domain::dto::{SportEventSummaryDto, TournamentDto};
use oddsfeed_domain::{impl_domain_tag_conversions, DtoPayload, Language, Urn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::merge::{CultureMerge, DataSource, LanguageTracker, LocalizedText};

/// Localised attributes readable through `get_translated_value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SportEventAttribute {
    Name,
    TournamentName,
    VenueName,
}

impl_domain_tag_conversions!(SportEventAttribute {
    Name => "name",
    TournamentName => "tournament_name",
    VenueName => "venue_name",
});

/// State of a match, stage, tournament or season
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportEventData {
    pub names: LocalizedText,
    pub tournament_id: Option<Urn>,
    pub tournament_names: LocalizedText,
    pub venue_names: LocalizedText,
    pub sport_id: Option<Urn>,
    pub category_id: Option<Urn>,
    pub season_id: Option<Urn>,
    pub scheduled: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub start_time_confirmed: Option<bool>,
    pub competitor_ids: Vec<Urn>,
    pub qualifiers: BTreeMap<Urn, String>,
    pub reference_ids: BTreeMap<String, String>,
    pub loaded: LanguageTracker,
}

impl SportEventData {
    fn apply_summary(&mut self, summary: &SportEventSummaryDto, language: &Language) {
        self.names.set(language, summary.name.as_str());
        if summary.scheduled.is_some() {
            self.scheduled = summary.scheduled;
        }
        if summary.scheduled_end.is_some() {
            self.scheduled_end = summary.scheduled_end;
        }
        if let Some(tournament) = &summary.tournament {
            self.tournament_id = Some(tournament.id.clone());
            self.tournament_names.set(language, tournament.name.as_str());
            self.sport_id = Some(tournament.sport.id.clone());
            self.category_id = Some(tournament.category.id.clone());
        }
        if !summary.competitors.is_empty() {
            self.competitor_ids = summary.competitors.iter().map(|c| c.id.clone()).collect();
            for competitor in &summary.competitors {
                if let Some(qualifier) = &competitor.qualifier {
                    self.qualifiers.insert(competitor.id.clone(), qualifier.clone());
                }
            }
        }
        if let Some(venue) = &summary.venue {
            self.venue_names.set(language, venue.name.as_str());
        }
    }

    fn apply_tournament(&mut self, tournament: &TournamentDto, language: &Language) {
        self.names.set(language, tournament.name.as_str());
        self.sport_id = Some(tournament.sport.id.clone());
        self.category_id = Some(tournament.category.id.clone());
    }
}

/// Cached sport event
#[derive(Debug)]
pub struct SportEventCacheItem {
    id: Urn,
    data: RwLock<SportEventData>,
}

impl SportEventCacheItem {
    /// Empty item; nothing loaded yet
    pub fn new(id: Urn) -> Self {
        Self::from_data(id, SportEventData::default())
    }

    pub fn from_data(id: Urn, data: SportEventData) -> Self {
        Self { id, data: RwLock::new(data) }
    }

    pub fn id(&self) -> &Urn {
        &self.id
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SportEventData {
        self.data.read().clone()
    }

    pub fn name(&self, language: &Language) -> Option<String> {
        self.translated(SportEventAttribute::Name, language)
    }

    pub fn translated(&self, attribute: SportEventAttribute, language: &Language) -> Option<String> {
        let data = self.data.read();
        let text = match attribute {
            SportEventAttribute::Name => &data.names,
            SportEventAttribute::TournamentName => &data.tournament_names,
            SportEventAttribute::VenueName => &data.venue_names,
        };
        text.get(language).map(str::to_string)
    }

    pub fn competitor_ids(&self) -> Vec<Urn> {
        self.data.read().competitor_ids.clone()
    }

    pub fn tournament_id(&self) -> Option<Urn> {
        self.data.read().tournament_id.clone()
    }

    pub fn scheduled(&self) -> Option<DateTime<Utc>> {
        self.data.read().scheduled
    }

    pub fn start_time_confirmed(&self) -> Option<bool> {
        self.data.read().start_time_confirmed
    }

    /// Languages delivered by `source`
    pub fn loaded_for(&self, source: DataSource) -> BTreeSet<Language> {
        self.data.read().loaded.loaded(source)
    }

    pub fn missing_for(&self, source: DataSource, wanted: &[Language]) -> Vec<Language> {
        self.data.read().loaded.missing(source, wanted)
    }
}

impl CultureMerge for SportEventCacheItem {
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool {
        let mut data = self.data.write();
        match payload {
            DtoPayload::SportEventSummary(summary) | DtoPayload::MatchSummary(summary)
                if summary.id == self.id =>
            {
                data.apply_summary(summary, language);
                data.loaded.mark(DataSource::Summary, language);
                true
            }
            DtoPayload::Fixture(fixture) if fixture.event.id == self.id => {
                data.apply_summary(&fixture.event, language);
                data.start_time_confirmed = Some(fixture.start_time_confirmed);
                data.reference_ids.extend(fixture.reference_ids.clone());
                data.loaded.mark(DataSource::Fixture, language);
                true
            }
            DtoPayload::TournamentInfo(info) if info.tournament.id == self.id => {
                data.apply_tournament(&info.tournament, language);
                if !info.competitors.is_empty() {
                    data.competitor_ids = info.competitors.iter().map(|c| c.id.clone()).collect();
                }
                if info.season_id.is_some() {
                    data.season_id = info.season_id.clone();
                }
                data.loaded.mark(DataSource::Summary, language);
                true
            }
            DtoPayload::Tournament(tournament) if tournament.id == self.id => {
                data.apply_tournament(tournament, language);
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

#[cfg(test)]
mod tests {
    use oddsfeed_domain::dto::{
        CategoryDto, CompetitorDto, FixtureDto, SportDto, SportEventSummaryDto, VenueDto,
    };

    use super::*;

    fn urn(s: &str) -> Urn {
        s.parse().unwrap()
    }

    fn lang(code: &str) -> Language {
        Language::new(code).unwrap()
    }

    fn summary(name: &str) -> SportEventSummaryDto {
        let mut summary = SportEventSummaryDto::new(urn("sr:match:123"), name);
        summary.competitors = vec![
            CompetitorDto::new(urn("sr:competitor:1"), "Team A").with_qualifier("home"),
            CompetitorDto::new(urn("sr:competitor:2"), "Team B").with_qualifier("away"),
        ];
        summary.tournament = Some(TournamentDto::new(
            urn("sr:tournament:17"),
            "Premier League",
            SportDto::new(urn("sr:sport:1"), "Soccer"),
            CategoryDto::new(urn("sr:category:1"), urn("sr:sport:1"), "England"),
        ));
        summary
    }

    #[test]
    fn test_merge_summary_populates_state() {
        let item = SportEventCacheItem::new(urn("sr:match:123"));
        let merged =
            item.merge_dto(&DtoPayload::MatchSummary(summary("Team A vs Team B")), &lang("en"));

        assert!(merged);
        assert_eq!(item.name(&lang("en")).as_deref(), Some("Team A vs Team B"));
        assert_eq!(item.competitor_ids().len(), 2);
        assert_eq!(item.tournament_id(), Some(urn("sr:tournament:17")));
        assert_eq!(
            item.translated(SportEventAttribute::TournamentName, &lang("en")).as_deref(),
            Some("Premier League")
        );
        assert!(item.has_translations_for(&[lang("en")]));
        assert_eq!(item.missing_languages(&[lang("en"), lang("de")]), vec![lang("de")]);
    }

    /// Validates merge idempotence.
    ///
    /// Assertions:
    /// - Confirms merging the same payload twice yields the state of one merge.
    #[test]
    fn test_merge_is_idempotent() {
        let payload = DtoPayload::MatchSummary(summary("Team A vs Team B"));
        let once = SportEventCacheItem::new(urn("sr:match:123"));
        once.merge_dto(&payload, &lang("en"));

        let twice = SportEventCacheItem::new(urn("sr:match:123"));
        twice.merge_dto(&payload, &lang("en"));
        twice.merge_dto(&payload, &lang("en"));

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_fixture_tracked_separately() {
        let item = SportEventCacheItem::new(urn("sr:match:123"));
        let mut fixture = FixtureDto::new(summary("Team A vs Team B"));
        fixture.start_time_confirmed = true;
        fixture.event.venue = Some(VenueDto {
            id: urn("sr:venue:5"),
            name: "Stadium".to_string(),
            city: None,
            country_code: None,
            capacity: None,
        });

        assert!(item.merge_dto(&DtoPayload::Fixture(fixture), &lang("en")));
        assert!(item.missing_languages(&[lang("en")]).contains(&lang("en")));
        assert!(item.missing_for(DataSource::Fixture, &[lang("en")]).is_empty());
        assert_eq!(item.start_time_confirmed(), Some(true));
        assert_eq!(
            item.translated(SportEventAttribute::VenueName, &lang("en")).as_deref(),
            Some("Stadium")
        );
    }

    #[test]
    fn test_foreign_payload_ignored() {
        let item = SportEventCacheItem::new(urn("sr:match:999"));
        assert!(!item.merge_dto(&DtoPayload::MatchSummary(summary("x")), &lang("en")));
        assert!(item.loaded_languages().is_empty());
    }

    #[test]
    fn test_empty_translation_counts_as_loaded() {
        let item = SportEventCacheItem::new(urn("sr:match:123"));
        item.merge_dto(&DtoPayload::MatchSummary(summary("")), &lang("de"));

        assert!(item.has_translations_for(&[lang("de")]));
        assert_eq!(item.name(&lang("de")).as_deref(), Some(""));
    }

    #[test]
    fn test_attribute_parse() {
        assert_eq!("venue_name".parse::<SportEventAttribute>(), Ok(SportEventAttribute::VenueName));
    }
}
