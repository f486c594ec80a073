//! Shared test helpers for `oddsfeed-core` integration tests.
//!
//! Provides a counting mock router, payload fixtures and a harness that
//! wires every specialized cache into one manager.

#![allow(dead_code)]

pub mod router;

use std::sync::Arc;
use std::time::Duration;

use oddsfeed_core::{
    CacheDeps, CacheManager, InvariantMarketCache, ProfileCache, SportDataCache, SportEventCache,
    SportEventStatusCache, VariantDescriptionCache, VariantMarketCache,
};
use oddsfeed_domain::dto::{
    CategoryDto, CompetitorDto, CompetitorProfileDto, PlayerDto, SportDto, SportEventStatusDto,
    SportEventSummaryDto, TournamentDto,
};
use oddsfeed_domain::{CacheSettings, ExceptionHandlingStrategy, Language, Urn};

pub use router::{kind, MockDataRouter};

pub fn urn(value: &str) -> Urn {
    value.parse().unwrap()
}

pub fn lang(code: &str) -> Language {
    Language::new(code).unwrap()
}

pub fn langs(codes: &[&str]) -> Vec<Language> {
    codes.iter().map(|code| lang(code)).collect()
}

pub fn premier_league() -> TournamentDto {
    TournamentDto::new(
        urn("sr:tournament:17"),
        "Premier League",
        SportDto::new(urn("sr:sport:1"), "Soccer"),
        CategoryDto::new(urn("sr:category:1"), urn("sr:sport:1"), "England"),
    )
}

/// Summary of `sr:match:123` between `sr:competitor:1` and `sr:competitor:2`
pub fn match_summary(name: &str, home: &str, away: &str) -> SportEventSummaryDto {
    let mut summary = SportEventSummaryDto::new(urn("sr:match:123"), name);
    summary.tournament = Some(premier_league());
    summary.competitors = vec![
        CompetitorDto::new(urn("sr:competitor:1"), home).with_qualifier("home"),
        CompetitorDto::new(urn("sr:competitor:2"), away).with_qualifier("away"),
    ];
    summary
}

pub fn with_status(mut summary: SportEventSummaryDto, status: SportEventStatusDto) -> SportEventSummaryDto {
    summary.status = Some(status);
    summary
}

/// Profile of `sr:competitor:1` with one rostered player `sr:player:10`
pub fn team_profile(team: &str, player: &str) -> CompetitorProfileDto {
    CompetitorProfileDto::new(
        CompetitorDto::new(urn("sr:competitor:1"), team),
        vec![PlayerDto::new(urn("sr:player:10"), player)],
    )
}

pub fn fast_settings() -> CacheSettings {
    let mut settings = CacheSettings::default();
    settings.locking.poll_interval = Duration::from_millis(2);
    settings.locking.staleness_ceiling = Duration::from_secs(5);
    settings.locking.dedup_timeout = Duration::from_secs(5);
    settings.languages.wanted = langs(&["en", "de"]);
    settings
}

/// Every specialized cache registered with one manager
pub struct Harness {
    pub router: Arc<MockDataRouter>,
    pub manager: Arc<CacheManager>,
    pub events: Arc<SportEventCache>,
    pub statuses: Arc<SportEventStatusCache>,
    pub profiles: Arc<ProfileCache>,
    pub sport_data: Arc<SportDataCache>,
    pub markets: Arc<InvariantMarketCache>,
    pub variant_markets: Arc<VariantMarketCache>,
    pub variants: Arc<VariantDescriptionCache>,
}

impl Harness {
    pub fn new(router: MockDataRouter) -> Self {
        Self::with_settings(router, fast_settings())
    }

    pub fn with_strategy(router: MockDataRouter, strategy: ExceptionHandlingStrategy) -> Self {
        let mut settings = fast_settings();
        settings.exception_strategy = strategy;
        Self::with_settings(router, settings)
    }

    pub fn with_settings(router: MockDataRouter, settings: CacheSettings) -> Self {
        let router = Arc::new(router);
        let manager = Arc::new(CacheManager::new());
        let deps = CacheDeps::new(router.clone(), &manager, &settings);

        let events = Arc::new(SportEventCache::new(&settings.sport_event_cache, deps.clone()));
        let statuses = Arc::new(SportEventStatusCache::new(&settings.sport_event_cache, deps.lock_config));
        let profiles = Arc::new(ProfileCache::new(&settings.profile_cache, deps.clone()));
        let sport_data = Arc::new(SportDataCache::new(deps.clone()));
        let markets = Arc::new(InvariantMarketCache::new(deps.clone()));
        let variant_markets = Arc::new(VariantMarketCache::new(&settings.market_cache, deps.clone()));
        let variants = Arc::new(VariantDescriptionCache::new(deps));

        manager.register(events.clone()).unwrap();
        manager.register(statuses.clone()).unwrap();
        manager.register(profiles.clone()).unwrap();
        manager.register(sport_data.clone()).unwrap();
        manager.register(markets.clone()).unwrap();
        manager.register(variant_markets.clone()).unwrap();
        manager.register(variants.clone()).unwrap();

        Self { router, manager, events, statuses, profiles, sport_data, markets, variant_markets, variants }
    }
}
