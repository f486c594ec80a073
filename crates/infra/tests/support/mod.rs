//! Shared helpers for `oddsfeed-infra` integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use oddsfeed_core::{DataRouter, FetchResult};
use oddsfeed_domain::dto::{
    CompetitorDto, CompetitorProfileDto, FixtureDto, MarketDescriptionDto,
    MarketDescriptionListDto, PlayerDto, PlayerProfileDto, SportDto, SportEntryDto, SportListDto,
    SportEventSummaryDto, TournamentInfoDto, VariantDescriptionListDto,
};
use oddsfeed_domain::{CacheSettings, FetchError, Language, Urn};
use parking_lot::Mutex;

pub fn urn(value: &str) -> Urn {
    value.parse().unwrap()
}

pub fn lang(code: &str) -> Language {
    Language::new(code).unwrap()
}

/// Settings with short waits, `en` + `de`, refresh disabled
pub fn test_settings() -> CacheSettings {
    let mut settings = CacheSettings::default();
    settings.languages.wanted = vec![lang("en"), lang("de")];
    settings.locking.poll_interval = Duration::from_millis(2);
    settings.locking.staleness_ceiling = Duration::from_secs(5);
    settings.locking.dedup_timeout = Duration::from_secs(5);
    settings.refresh.enabled = false;
    settings
}

/// Router answering from canned data and counting calls per operation
#[derive(Default)]
pub struct CannedRouter {
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl CannedRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    fn record(&self, operation: &'static str) {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
    }
}

fn summary(id: &Urn, language: &Language) -> SportEventSummaryDto {
    let mut summary = SportEventSummaryDto::new(id.clone(), format!("{id} [{}]", language.as_str()));
    summary.competitors = vec![
        CompetitorDto::new(urn("sr:competitor:1"), "Home").with_qualifier("home"),
        CompetitorDto::new(urn("sr:competitor:2"), "Away").with_qualifier("away"),
    ];
    summary
}

#[async_trait]
impl DataRouter for CannedRouter {
    async fn sport_event_summary(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<SportEventSummaryDto> {
        self.record("summary");
        Ok(summary(id, language))
    }

    async fn sport_event_fixture(&self, id: &Urn, language: &Language) -> FetchResult<FixtureDto> {
        self.record("fixture");
        Ok(FixtureDto::new(summary(id, language)))
    }

    async fn tournament_info(
        &self,
        id: &Urn,
        _language: &Language,
    ) -> FetchResult<TournamentInfoDto> {
        self.record("tournament");
        Err(FetchError::not_found(id))
    }

    async fn competitor_profile(
        &self,
        id: &Urn,
        language: &Language,
    ) -> FetchResult<CompetitorProfileDto> {
        self.record("competitor");
        Ok(CompetitorProfileDto::new(
            CompetitorDto::new(id.clone(), format!("Team [{}]", language.as_str())),
            vec![PlayerDto::new(urn("sr:player:10"), "Player")],
        ))
    }

    async fn player_profile(&self, id: &Urn, _language: &Language) -> FetchResult<PlayerProfileDto> {
        self.record("player");
        Err(FetchError::not_found(id))
    }

    async fn all_sports(&self, language: &Language) -> FetchResult<SportListDto> {
        self.record("sports");
        Ok(SportListDto {
            sports: vec![SportEntryDto {
                sport: SportDto::new(urn("sr:sport:1"), format!("Soccer [{}]", language.as_str())),
                categories: Vec::new(),
            }],
        })
    }

    async fn market_descriptions(
        &self,
        _language: &Language,
    ) -> FetchResult<MarketDescriptionListDto> {
        self.record("markets");
        Ok(MarketDescriptionListDto { markets: vec![MarketDescriptionDto::new(1, "1x2")] })
    }

    async fn variant_market_description(
        &self,
        market_id: u32,
        _variant: &str,
        _language: &Language,
    ) -> FetchResult<MarketDescriptionDto> {
        self.record("variant_market");
        Err(FetchError::not_found(market_id))
    }

    async fn variant_descriptions(
        &self,
        _language: &Language,
    ) -> FetchResult<VariantDescriptionListDto> {
        self.record("variants");
        Ok(VariantDescriptionListDto::default())
    }
}
