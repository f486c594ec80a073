//! Competitor and player profiles
//!
//! Player names are resolved through the competitor first: one competitor
//! profile carries the whole roster, so fetching it per language usually
//! makes per-player fetches unnecessary. Players upstream has no profile
//! for are remembered as loaded with an empty name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
use oddsfeed_common::sync::{InFlightBag, KeyLockManager};
use oddsfeed_domain::constants::PROFILE_CACHE_NAME;
use oddsfeed_domain::dto::CompetitorDto;
use oddsfeed_domain::{
    CacheError, CacheItemType, DtoPayload, DtoType, FetchError, Language, ProfileCacheSettings,
    Result, Urn,
};
use tracing::{debug, instrument, warn};

use super::support::{fetch_languages, merge_under_lock, CacheDeps};
use crate::data_router_ports::FetchResult;
use crate::export::ExportableItem;
use crate::health::CacheHealth;
use crate::items::{CompetitorCacheItem, PlayerCacheItem};
use crate::manager::{DtoEnvelope, Requester, SpecializedCache};
use crate::merge::CultureMerge;

const ACCEPTED: &[DtoType] = &[
    DtoType::Competitor,
    DtoType::CompetitorProfile,
    DtoType::PlayerProfile,
    DtoType::SportEventSummary,
    DtoType::MatchSummary,
    DtoType::Fixture,
    DtoType::TournamentInfo,
];

const ITEM_TYPES: &[CacheItemType] = &[CacheItemType::Competitor, CacheItemType::Player];

fn store_config(name: &str, settings: &ProfileCacheSettings) -> StoreConfig {
    let mut builder = StoreConfig::builder(name).sliding_ttl(settings.sliding_ttl);
    if let Some(jitter) = settings.sliding_jitter {
        builder = builder.sliding_jitter(jitter);
    }
    if let Some(capacity) = settings.max_capacity {
        builder = builder.max_capacity(capacity);
    }
    builder.build()
}

pub struct ProfileCache {
    competitors: ExpiringStore<Arc<CompetitorCacheItem>>,
    players: ExpiringStore<Arc<PlayerCacheItem>>,
    locks: KeyLockManager,
    competitor_fetches: InFlightBag,
    player_fetches: InFlightBag,
    deps: CacheDeps,
}

impl ProfileCache {
    pub fn new(settings: &ProfileCacheSettings, deps: CacheDeps) -> Self {
        Self {
            competitors: ExpiringStore::new(store_config("ProfileCache.competitors", settings)),
            players: ExpiringStore::new(store_config("ProfileCache.players", settings)),
            locks: KeyLockManager::new(PROFILE_CACHE_NAME, deps.lock_config),
            competitor_fetches: InFlightBag::new("competitors"),
            player_fetches: InFlightBag::new("players"),
            deps,
        }
    }

    fn competitor_item(&self, id: &Urn) -> Option<Arc<CompetitorCacheItem>> {
        if !id.is_competitor() {
            return None;
        }
        self.competitors.get_or_insert_with(id.to_string(), EvictionPriority::Normal, || {
            Arc::new(CompetitorCacheItem::new(id.clone()))
        })
    }

    fn player_item(&self, id: &Urn) -> Option<Arc<PlayerCacheItem>> {
        if !id.is_player() {
            return None;
        }
        self.players.get_or_insert_with(id.to_string(), EvictionPriority::Normal, || {
            Arc::new(PlayerCacheItem::new(id.clone()))
        })
    }

    /// Competitor with its profile loaded in `languages`
    ///
    /// # Errors
    ///
    /// `CacheItemNotFound` for non-competitor ids, and for fetch failures
    /// when the exception strategy is `Throw`.
    #[instrument(skip(self, languages), fields(cache = PROFILE_CACHE_NAME))]
    pub async fn get_competitor(
        &self,
        id: &Urn,
        languages: &[Language],
    ) -> Result<Arc<CompetitorCacheItem>> {
        let item = self.competitor_item(id).ok_or_else(|| CacheError::not_found(id))?;
        if let Err(err) = self.load_competitor(&item, languages).await {
            self.deps.handle_fetch_error(PROFILE_CACHE_NAME, &id.to_string(), err)?;
        }
        Ok(item)
    }

    /// Player with a name in every language of `languages`
    ///
    /// # Errors
    ///
    /// Same contract as [`ProfileCache::get_competitor`]. Upstream `NotFound`
    /// for a player is not an error: the language is loaded with an empty
    /// name.
    ///
    /// `competitor` names a team the player is known to belong to. When the
    /// cached player has no team yet the hint is recorded, so missing names
    /// come from that team's roster before a player profile is requested.
    #[instrument(skip(self, languages), fields(cache = PROFILE_CACHE_NAME))]
    pub async fn get_player(
        &self,
        id: &Urn,
        languages: &[Language],
        competitor: Option<&Urn>,
    ) -> Result<Arc<PlayerCacheItem>> {
        let item = self.player_item(id).ok_or_else(|| CacheError::not_found(id))?;
        if let Some(competitor) = competitor.filter(|urn| urn.is_competitor()) {
            if item.competitor_id().is_none() {
                item.set_competitor_id(competitor.clone());
            }
        }
        if let Err(err) = self.load_player(&item, languages).await {
            self.deps.handle_fetch_error(PROFILE_CACHE_NAME, &id.to_string(), err)?;
        }
        Ok(item)
    }

    /// Names of several competitors, loaded concurrently
    pub async fn get_competitor_names(
        &self,
        ids: &[Urn],
        languages: &[Language],
    ) -> Result<BTreeMap<Urn, BTreeMap<Language, String>>> {
        let loaded = join_all(ids.iter().map(|id| self.get_competitor(id, languages))).await;
        let mut names = BTreeMap::new();
        for item in loaded {
            let item = item?;
            names.insert(item.id().clone(), item.names(languages));
        }
        Ok(names)
    }

    /// Names of several players, loaded concurrently
    pub async fn get_player_names(
        &self,
        ids: &[Urn],
        languages: &[Language],
    ) -> Result<BTreeMap<Urn, BTreeMap<Language, String>>> {
        let loaded = join_all(ids.iter().map(|id| self.get_player(id, languages, None))).await;
        let mut names = BTreeMap::new();
        for item in loaded {
            let item = item?;
            names.insert(item.id().clone(), item.names(languages));
        }
        Ok(names)
    }

    /// Cached competitor without fetching
    pub fn peek_competitor(&self, id: &Urn) -> Option<Arc<CompetitorCacheItem>> {
        self.competitors.get(&id.to_string())
    }

    /// Cached player without fetching
    pub fn peek_player(&self, id: &Urn) -> Option<Arc<PlayerCacheItem>> {
        self.players.get(&id.to_string())
    }

    async fn load_competitor(
        &self,
        item: &Arc<CompetitorCacheItem>,
        languages: &[Language],
    ) -> FetchResult<()> {
        if item.has_translations_for(languages) {
            return Ok(());
        }

        let key = item.id().to_string();
        let _slot = self.deps.dedup.claim(&self.competitor_fetches, &key).await;
        let missing = item.missing_languages(languages);
        if missing.is_empty() {
            return Ok(());
        }
        debug!(id = %key, ?missing, "fetching competitor profile");

        let router = Arc::clone(&self.deps.router);
        let id = item.id().clone();
        let results = fetch_languages(&missing, |language| {
            let router = Arc::clone(&router);
            let id = id.clone();
            async move { router.competitor_profile(&id, &language).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(profile) => {
                    let envelope =
                        DtoEnvelope::new(key.clone(), DtoPayload::CompetitorProfile(profile), language)
                            .with_requester(Requester::Competitor(Arc::clone(item)));
                    self.deps.deliver(envelope, self).await;
                }
                Err(err) => {
                    warn!(id = %key, %language, error = %err, "competitor profile fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn load_player(&self, item: &Arc<PlayerCacheItem>, languages: &[Language]) -> FetchResult<()> {
        if item.has_translations_for(languages) {
            return Ok(());
        }

        let key = item.id().to_string();
        let _slot = self.deps.dedup.claim(&self.player_fetches, &key).await;
        let mut missing = item.missing_languages(languages);
        if missing.is_empty() {
            return Ok(());
        }

        // The roster of the associated competitor carries player names
        if let Some(competitor) = item.competitor_id().and_then(|id| self.competitor_item(&id)) {
            if let Err(err) = self.load_competitor(&competitor, &missing).await {
                debug!(id = %key, error = %err, "competitor fetch for player failed, falling back");
            }
            missing = item.missing_languages(languages);
            if missing.is_empty() {
                return Ok(());
            }
        }
        debug!(id = %key, ?missing, "fetching player profile");

        let router = Arc::clone(&self.deps.router);
        let id = item.id().clone();
        let results = fetch_languages(&missing, |language| {
            let router = Arc::clone(&router);
            let id = id.clone();
            async move { router.player_profile(&id, &language).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(profile) => {
                    let envelope =
                        DtoEnvelope::new(key.clone(), DtoPayload::PlayerProfile(profile), language)
                            .with_requester(Requester::Player(Arc::clone(item)));
                    self.deps.deliver(envelope, self).await;
                }
                Err(err) if err.is_not_found() => {
                    debug!(id = %key, %language, "player has no profile");
                    item.mark_not_found(&language);
                }
                Err(err) => {
                    warn!(id = %key, %language, error = %err, "player profile fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn merge_competitor(
        &self,
        id: &Urn,
        payload: &DtoPayload,
        language: &Language,
        requester: Option<&Arc<CompetitorCacheItem>>,
    ) -> bool {
        if !id.is_competitor() {
            return false;
        }
        let requester = requester.filter(|item| item.id() == id);
        merge_under_lock(
            &self.locks,
            &self.competitors,
            id.to_string(),
            EvictionPriority::Normal,
            payload,
            language,
            requester,
            || CompetitorCacheItem::new(id.clone()),
        )
        .await
    }

    async fn merge_player(
        &self,
        id: &Urn,
        payload: &DtoPayload,
        language: &Language,
        requester: Option<&Arc<PlayerCacheItem>>,
    ) -> bool {
        if !id.is_player() {
            return false;
        }
        let requester = requester.filter(|item| item.id() == id);
        merge_under_lock(
            &self.locks,
            &self.players,
            id.to_string(),
            EvictionPriority::Normal,
            payload,
            language,
            requester,
            || PlayerCacheItem::new(id.clone()),
        )
        .await
    }

    async fn merge_referenced(
        &self,
        competitors: &[CompetitorDto],
        payload: &DtoPayload,
        language: &Language,
    ) -> bool {
        let mut merged = false;
        for competitor in competitors {
            merged |= self.merge_competitor(&competitor.id, payload, language, None).await;
        }
        merged
    }
}

#[async_trait]
impl SpecializedCache for ProfileCache {
    fn name(&self) -> &str {
        PROFILE_CACHE_NAME
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        ACCEPTED
    }

    fn item_types(&self) -> &[CacheItemType] {
        ITEM_TYPES
    }

    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool> {
        let language = &envelope.language;
        let payload = &envelope.payload;
        let merged = match payload {
            DtoPayload::CompetitorProfile(profile) => {
                let requester = match &envelope.requester {
                    Some(Requester::Competitor(item)) => Some(item),
                    _ => None,
                };
                let mut merged =
                    self.merge_competitor(&profile.competitor.id, payload, language, requester).await;
                for player in &profile.players {
                    merged |= self.merge_player(&player.id, payload, language, None).await;
                }
                merged
            }
            DtoPayload::PlayerProfile(profile) => {
                let requester = match &envelope.requester {
                    Some(Requester::Player(item)) => Some(item),
                    _ => None,
                };
                self.merge_player(&profile.id, payload, language, requester).await
            }
            DtoPayload::Competitor(competitor) => {
                self.merge_competitor(&competitor.id, payload, language, None).await
            }
            DtoPayload::SportEventSummary(summary) | DtoPayload::MatchSummary(summary) => {
                self.merge_referenced(&summary.competitors, payload, language).await
            }
            DtoPayload::Fixture(fixture) => {
                self.merge_referenced(&fixture.event.competitors, payload, language).await
            }
            DtoPayload::TournamentInfo(info) => {
                self.merge_referenced(&info.competitors, payload, language).await
            }
            other => {
                return Err(CacheError::UnsupportedDto {
                    cache: PROFILE_CACHE_NAME.to_string(),
                    dto_type: other.dto_type(),
                })
            }
        };
        Ok(merged)
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        let competitor = item_type.matches(CacheItemType::Competitor)
            && self.competitors.remove(id).is_some();
        let player = item_type.matches(CacheItemType::Player) && self.players.remove(id).is_some();
        competitor || player
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        (item_type.matches(CacheItemType::Competitor) && self.competitors.contains(id))
            || (item_type.matches(CacheItemType::Player) && self.players.contains(id))
    }

    fn health(&self) -> CacheHealth {
        let competitors = self.competitors.stats();
        let players = self.players.stats();
        let healthy = !self.competitors.is_disposed() && !self.players.is_disposed();
        CacheHealth::new(PROFILE_CACHE_NAME, healthy, competitors.size + players.size)
            .with_detail("competitors", competitors.size)
            .with_detail("players", players.size)
            .with_detail("competitor_hit_rate", format!("{:.2}", competitors.hit_rate()))
            .with_detail("player_hit_rate", format!("{:.2}", players.hit_rate()))
            .with_detail("held_locks", self.locks.held_count())
            .with_detail(
                "in_flight",
                self.competitor_fetches.len() + self.player_fetches.len(),
            )
    }

    async fn export(&self) -> Vec<ExportableItem> {
        let _global = self.locks.lock_all().await;
        let mut items: Vec<ExportableItem> = self
            .competitors
            .values()
            .into_iter()
            .map(|item| ExportableItem::Competitor { id: item.id().clone(), data: item.snapshot() })
            .chain(
                self.players
                    .values()
                    .into_iter()
                    .map(|item| ExportableItem::Player { id: item.id().clone(), data: item.snapshot() }),
            )
            .collect();
        items.sort_by_key(ExportableItem::key);
        items
    }

    async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let _global = self.locks.lock_all().await;
        let mut imported = 0;
        for item in items {
            match item {
                ExportableItem::Competitor { id, data } => {
                    let restored = CompetitorCacheItem::from_data(id.clone(), data.clone());
                    self.competitors.add(id.to_string(), Arc::new(restored), EvictionPriority::Normal);
                    imported += 1;
                }
                ExportableItem::Player { id, data } => {
                    let restored = PlayerCacheItem::from_data(id.clone(), data.clone());
                    self.players.add(id.to_string(), Arc::new(restored), EvictionPriority::Normal);
                    imported += 1;
                }
                _ => {}
            }
        }
        Ok(imported)
    }

    async fn delete_all(&self) {
        let _global = self.locks.lock_all().await;
        self.competitors.clear();
        self.players.clear();
    }

    fn clean_locks(&self) -> usize {
        self.locks.clean()
    }

    fn dispose(&self) {
        self.competitors.dispose();
        self.players.dispose();
    }
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("competitors", &self.competitors)
            .field("players", &self.players)
            .finish_non_exhaustive()
    }
}
