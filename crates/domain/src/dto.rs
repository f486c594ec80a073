//! Data-transfer objects and the payload sum type routed between caches
//!
//! Every DTO carries data for exactly one language; the language travels
//! next to the payload. `DtoPayload` has one variant per `DtoType` so routing
//! and merging are exhaustive matches instead of runtime casts.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_tag_conversions;
use crate::urn::Urn;

/// Routing tag of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtoType {
    SportEventSummary,
    MatchSummary,
    Fixture,
    TournamentInfo,
    SportEventStatus,
    Competitor,
    CompetitorProfile,
    PlayerProfile,
    SportList,
    Sport,
    Category,
    Tournament,
    MarketDescriptionList,
    VariantMarketDescription,
    VariantDescriptionList,
}

impl_domain_tag_conversions!(DtoType {
    SportEventSummary => "sport_event_summary",
    MatchSummary => "match_summary",
    Fixture => "fixture",
    TournamentInfo => "tournament_info",
    SportEventStatus => "sport_event_status",
    Competitor => "competitor",
    CompetitorProfile => "competitor_profile",
    PlayerProfile => "player_profile",
    SportList => "sport_list",
    Sport => "sport",
    Category => "category",
    Tournament => "tournament",
    MarketDescriptionList => "market_description_list",
    VariantMarketDescription => "variant_market_description",
    VariantDescriptionList => "variant_description_list",
});

// ============================================================================
// Sports, categories, tournaments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportDto {
    pub id: Urn,
    pub name: String,
}

impl SportDto {
    pub fn new(id: Urn, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDto {
    pub id: Urn,
    pub sport_id: Urn,
    pub name: String,
    pub country_code: Option<String>,
}

impl CategoryDto {
    pub fn new(id: Urn, sport_id: Urn, name: impl Into<String>) -> Self {
        Self { id, sport_id, name: name.into(), country_code: None }
    }
}

/// One sport with the categories listed under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportEntryDto {
    pub sport: SportDto,
    #[serde(default)]
    pub categories: Vec<CategoryDto>,
}

/// The "all sports" list for one language
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SportListDto {
    pub sports: Vec<SportEntryDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentDto {
    pub id: Urn,
    pub name: String,
    pub sport: SportDto,
    pub category: CategoryDto,
}

impl TournamentDto {
    pub fn new(id: Urn, name: impl Into<String>, sport: SportDto, category: CategoryDto) -> Self {
        Self { id, name: name.into(), sport, category }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentInfoDto {
    pub tournament: TournamentDto,
    #[serde(default)]
    pub competitors: Vec<CompetitorDto>,
    pub season_id: Option<Urn>,
}

// ============================================================================
// Competitors and players
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDto {
    pub id: Urn,
    pub name: String,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub capacity: Option<u32>,
}

/// Competitor as referenced from an event or a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorDto {
    pub id: Urn,
    pub name: String,
    pub abbreviation: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    /// `home` / `away` when referenced from a match
    pub qualifier: Option<String>,
}

impl CompetitorDto {
    pub fn new(id: Urn, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            abbreviation: None,
            country: None,
            country_code: None,
            qualifier: None,
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// Roster entry inside a competitor profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDto {
    pub id: Urn,
    pub name: String,
    pub jersey_number: Option<u32>,
    pub position: Option<String>,
}

impl PlayerDto {
    pub fn new(id: Urn, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), jersey_number: None, position: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorProfileDto {
    pub competitor: CompetitorDto,
    #[serde(default)]
    pub players: Vec<PlayerDto>,
    pub venue: Option<VenueDto>,
}

impl CompetitorProfileDto {
    pub fn new(competitor: CompetitorDto, players: Vec<PlayerDto>) -> Self {
        Self { competitor, players, venue: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfileDto {
    pub id: Urn,
    pub name: String,
    pub full_name: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub position: Option<String>,
    pub competitor_id: Option<Urn>,
}

impl PlayerProfileDto {
    pub fn new(id: Urn, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            full_name: None,
            nationality: None,
            date_of_birth: None,
            position: None,
            competitor_id: None,
        }
    }
}

// ============================================================================
// Sport events
// ============================================================================

/// Lifecycle of a sport event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    NotStarted,
    Live,
    Suspended,
    Ended,
    Closed,
    Cancelled,
    Delayed,
    Interrupted,
    Postponed,
    Abandoned,
    #[serde(other)]
    Unknown,
}

impl_domain_tag_conversions!(EventStatus {
    NotStarted => "not_started",
    Live => "live",
    Suspended => "suspended",
    Ended => "ended",
    Closed => "closed",
    Cancelled => "cancelled",
    Delayed => "delayed",
    Interrupted => "interrupted",
    Postponed => "postponed",
    Abandoned => "abandoned",
    Unknown => "unknown",
});

/// Language-independent live status of an event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SportEventStatusDto {
    pub status: EventStatus,
    pub match_status_code: Option<i32>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub winner_id: Option<Urn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportEventSummaryDto {
    pub id: Urn,
    pub name: String,
    pub scheduled: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub tournament: Option<TournamentDto>,
    #[serde(default)]
    pub competitors: Vec<CompetitorDto>,
    pub venue: Option<VenueDto>,
    pub status: Option<SportEventStatusDto>,
}

impl SportEventSummaryDto {
    pub fn new(id: Urn, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scheduled: None,
            scheduled_end: None,
            tournament: None,
            competitors: Vec::new(),
            venue: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDto {
    pub event: SportEventSummaryDto,
    pub start_time_confirmed: bool,
    #[serde(default)]
    pub reference_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub extra_info: BTreeMap<String, String>,
}

impl FixtureDto {
    pub fn new(event: SportEventSummaryDto) -> Self {
        Self {
            event,
            start_time_confirmed: false,
            reference_ids: BTreeMap::new(),
            extra_info: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Market descriptions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDescriptionDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl OutcomeDescriptionDto {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), description: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecifierDto {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptionDto {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    /// Variant value for single variant market descriptions
    pub variant: Option<String>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDescriptionDto>,
    #[serde(default)]
    pub specifiers: Vec<SpecifierDto>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl MarketDescriptionDto {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            variant: None,
            outcomes: Vec::new(),
            specifiers: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_outcomes(mut self, outcomes: Vec<OutcomeDescriptionDto>) -> Self {
        self.outcomes = outcomes;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketDescriptionListDto {
    pub markets: Vec<MarketDescriptionDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptionDto {
    pub id: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDescriptionDto>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantDescriptionListDto {
    pub variants: Vec<VariantDescriptionDto>,
}

// ============================================================================
// Payload sum type
// ============================================================================

/// A typed payload; the variant determines the routing tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dto_type", content = "payload", rename_all = "snake_case")]
pub enum DtoPayload {
    SportEventSummary(SportEventSummaryDto),
    MatchSummary(SportEventSummaryDto),
    Fixture(FixtureDto),
    TournamentInfo(TournamentInfoDto),
    SportEventStatus(SportEventStatusDto),
    Competitor(CompetitorDto),
    CompetitorProfile(CompetitorProfileDto),
    PlayerProfile(PlayerProfileDto),
    SportList(SportListDto),
    Sport(SportDto),
    Category(CategoryDto),
    Tournament(TournamentDto),
    MarketDescriptionList(MarketDescriptionListDto),
    VariantMarketDescription(MarketDescriptionDto),
    VariantDescriptionList(VariantDescriptionListDto),
}

impl DtoPayload {
    pub fn dto_type(&self) -> DtoType {
        match self {
            Self::SportEventSummary(_) => DtoType::SportEventSummary,
            Self::MatchSummary(_) => DtoType::MatchSummary,
            Self::Fixture(_) => DtoType::Fixture,
            Self::TournamentInfo(_) => DtoType::TournamentInfo,
            Self::SportEventStatus(_) => DtoType::SportEventStatus,
            Self::Competitor(_) => DtoType::Competitor,
            Self::CompetitorProfile(_) => DtoType::CompetitorProfile,
            Self::PlayerProfile(_) => DtoType::PlayerProfile,
            Self::SportList(_) => DtoType::SportList,
            Self::Sport(_) => DtoType::Sport,
            Self::Category(_) => DtoType::Category,
            Self::Tournament(_) => DtoType::Tournament,
            Self::MarketDescriptionList(_) => DtoType::MarketDescriptionList,
            Self::VariantMarketDescription(_) => DtoType::VariantMarketDescription,
            Self::VariantDescriptionList(_) => DtoType::VariantDescriptionList,
        }
    }

    /// Event summary carried by the payload, if any
    pub fn event_summary(&self) -> Option<&SportEventSummaryDto> {
        match self {
            Self::SportEventSummary(summary) | Self::MatchSummary(summary) => Some(summary),
            Self::Fixture(fixture) => Some(&fixture.event),
            _ => None,
        }
    }
}
