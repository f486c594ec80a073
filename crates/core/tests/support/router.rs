//! In-memory `DataRouter` that counts calls

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use oddsfeed_core::{DataRouter, FetchResult};
use oddsfeed_domain::dto::{
    CompetitorProfileDto, FixtureDto, MarketDescriptionDto, MarketDescriptionListDto,
    PlayerProfileDto, SportEventSummaryDto, SportListDto, TournamentInfoDto,
    VariantDescriptionListDto,
};
use oddsfeed_domain::{FetchError, Language, Urn};
use parking_lot::Mutex;

/// Fetch kinds as counted by [`MockDataRouter::calls`]
pub mod kind {
    pub const SUMMARY: &str = "summary";
    pub const FIXTURE: &str = "fixture";
    pub const TOURNAMENT: &str = "tournament";
    pub const COMPETITOR: &str = "competitor";
    pub const PLAYER: &str = "player";
    pub const SPORTS: &str = "sports";
    pub const MARKETS: &str = "markets";
    pub const VARIANT_MARKET: &str = "variant_market";
    pub const VARIANTS: &str = "variants";
}

type CallKey = (String, String, String);

/// Seeded responses keyed by (kind, id, language); anything unseeded is
/// `NotFound`.
#[derive(Default)]
pub struct MockDataRouter {
    summaries: HashMap<(String, String), SportEventSummaryDto>,
    fixtures: HashMap<(String, String), FixtureDto>,
    tournaments: HashMap<(String, String), TournamentInfoDto>,
    competitors: HashMap<(String, String), CompetitorProfileDto>,
    players: HashMap<(String, String), PlayerProfileDto>,
    sports: HashMap<String, SportListDto>,
    markets: HashMap<String, MarketDescriptionListDto>,
    variant_markets: HashMap<(String, String), MarketDescriptionDto>,
    variants: HashMap<String, VariantDescriptionListDto>,
    failures: Mutex<HashMap<CallKey, FetchError>>,
    calls: Mutex<HashMap<CallKey, usize>>,
    latency: Duration,
}

fn key(id: impl ToString, language: &Language) -> (String, String) {
    (id.to_string(), language.to_string())
}

impl MockDataRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, widening race windows
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_summary(mut self, language: &str, summary: SportEventSummaryDto) -> Self {
        let language = Language::new(language).unwrap();
        self.summaries.insert(key(&summary.id, &language), summary);
        self
    }

    pub fn with_fixture(mut self, language: &str, fixture: FixtureDto) -> Self {
        let language = Language::new(language).unwrap();
        self.fixtures.insert(key(&fixture.event.id, &language), fixture);
        self
    }

    pub fn with_tournament(mut self, language: &str, info: TournamentInfoDto) -> Self {
        let language = Language::new(language).unwrap();
        self.tournaments.insert(key(&info.tournament.id, &language), info);
        self
    }

    pub fn with_competitor(mut self, language: &str, profile: CompetitorProfileDto) -> Self {
        let language = Language::new(language).unwrap();
        self.competitors.insert(key(&profile.competitor.id, &language), profile);
        self
    }

    pub fn with_player(mut self, language: &str, profile: PlayerProfileDto) -> Self {
        let language = Language::new(language).unwrap();
        self.players.insert(key(&profile.id, &language), profile);
        self
    }

    pub fn with_sports(mut self, language: &str, list: SportListDto) -> Self {
        self.sports.insert(language.to_string(), list);
        self
    }

    pub fn with_markets(mut self, language: &str, list: MarketDescriptionListDto) -> Self {
        self.markets.insert(language.to_string(), list);
        self
    }

    pub fn with_variant_market(
        mut self,
        language: &str,
        variant: &str,
        market: MarketDescriptionDto,
    ) -> Self {
        let id = format!("{}?{}", market.id, variant);
        self.variant_markets.insert((id, language.to_string()), market);
        self
    }

    pub fn with_variants(mut self, language: &str, list: VariantDescriptionListDto) -> Self {
        self.variants.insert(language.to_string(), list);
        self
    }

    /// Make one (kind, id, language) call fail with `error`
    pub fn fail(&self, kind: &str, id: &str, language: &str, error: FetchError) {
        self.failures
            .lock()
            .insert((kind.to_string(), id.to_string(), language.to_string()), error);
    }

    pub fn calls(&self, kind: &str, id: &str, language: &str) -> usize {
        self.calls
            .lock()
            .get(&(kind.to_string(), id.to_string(), language.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn calls_of_kind(&self, kind: &str) -> usize {
        self.calls.lock().iter().filter(|(k, _)| k.0 == kind).map(|(_, n)| n).sum()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    async fn respond<T: Clone>(
        &self,
        kind: &str,
        id: &str,
        language: &Language,
        seeded: Option<&T>,
    ) -> FetchResult<T> {
        let call = (kind.to_string(), id.to_string(), language.to_string());
        *self.calls.lock().entry(call.clone()).or_insert(0) += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let failure = self.failures.lock().get(&call).cloned();
        if let Some(error) = failure {
            return Err(error);
        }
        seeded.cloned().ok_or_else(|| FetchError::not_found(id))
    }
}

#[async_trait]
impl DataRouter for MockDataRouter {
    async fn sport_event_summary(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<SportEventSummaryDto> {
        let seeded = self.summaries.get(&key(id, language));
        self.respond(kind::SUMMARY, &id.to_string(), language, seeded).await
    }

    async fn sport_event_fixture(&self, id: &Urn, language: &Language) -> FetchResult<FixtureDto> {
        let seeded = self.fixtures.get(&key(id, language));
        self.respond(kind::FIXTURE, &id.to_string(), language, seeded).await
    }

    async fn tournament_info(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<TournamentInfoDto> {
        let seeded = self.tournaments.get(&key(id, language));
        self.respond(kind::TOURNAMENT, &id.to_string(), language, seeded).await
    }

    async fn competitor_profile(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<CompetitorProfileDto> {
        let seeded = self.competitors.get(&key(id, language));
        self.respond(kind::COMPETITOR, &id.to_string(), language, seeded).await
    }

    async fn player_profile(&self, id: &Urn, language: &Language) -> FetchResult<PlayerProfileDto> {
        let seeded = self.players.get(&key(id, language));
        self.respond(kind::PLAYER, &id.to_string(), language, seeded).await
    }

    async fn all_sports(&self, language: &Language) -> FetchResult<SportListDto> {
        let seeded = self.sports.get(language.as_str());
        self.respond(kind::SPORTS, "all", language, seeded).await
    }

    async fn market_descriptions(
        &self,
        language: &Language,
    ) -> FetchResult<MarketDescriptionListDto> {
        let seeded = self.markets.get(language.as_str());
        self.respond(kind::MARKETS, "all", language, seeded).await
    }

    async fn variant_market_description(
        &self,
        market_id: u32,
        variant: &str,
        language: &Language,
    ) -> FetchResult<MarketDescriptionDto> {
        let id = format!("{market_id}?{variant}");
        let seeded = self.variant_markets.get(&(id.clone(), language.to_string()));
        self.respond(kind::VARIANT_MARKET, &id, language, seeded).await
    }

    async fn variant_descriptions(
        &self,
        language: &Language,
    ) -> FetchResult<VariantDescriptionListDto> {
        let seeded = self.variants.get(language.as_str());
        self.respond(kind::VARIANTS, "all", language, seeded).await
    }
}
