//! Upstream data router port
//!
//! Abstracts the feed API. Every call returns data for exactly one language;
//! the caches decide which languages are missing and issue one call each.

use async_trait::async_trait;
use oddsfeed_domain::dto::{
    CompetitorProfileDto, FixtureDto, MarketDescriptionDto, MarketDescriptionListDto,
    PlayerProfileDto, SportEventSummaryDto, SportListDto, TournamentInfoDto,
    VariantDescriptionListDto,
};
use oddsfeed_domain::{FetchError, Language, Urn};

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Single-language fetch operations against the upstream API
#[async_trait]
pub trait DataRouter: Send + Sync {
    /// Summary of a match, stage or race event
    async fn sport_event_summary(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<SportEventSummaryDto>;

    async fn sport_event_fixture(&self, id: &Urn, language: &Language) -> FetchResult<FixtureDto>;

    /// Info of a tournament, season or simple tournament
    async fn tournament_info(&self, id: &Urn, language: &Language)
        -> FetchResult<TournamentInfoDto>;

    /// Competitor profile including its player roster
    async fn competitor_profile(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<CompetitorProfileDto>;

    async fn player_profile(&self, id: &Urn, language: &Language) -> FetchResult<PlayerProfileDto>;

    async fn all_sports(&self, language: &Language) -> FetchResult<SportListDto>;

    /// Invariant market descriptions
    async fn market_descriptions(&self, language: &Language)
        -> FetchResult<MarketDescriptionListDto>;

    /// Description of one market for one variant value
    async fn variant_market_description(
        &self,
        market_id: u32,
        variant: &str,
        language: &Language,
    ) -> FetchResult<MarketDescriptionDto>;

    async fn variant_descriptions(
        &self,
        language: &Language,
    ) -> FetchResult<VariantDescriptionListDto>;
}
