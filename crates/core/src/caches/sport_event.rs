//! Sport event cache
//!
//! Holds matches, stages, tournaments and seasons. Summaries and fixtures are
//! fetched per missing language; every fetched payload is routed through the
//! manager so competitor and status caches see it too.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
use oddsfeed_common::sync::{InFlightBag, KeyLockManager};
use oddsfeed_domain::constants::SPORT_EVENT_CACHE_NAME;
use oddsfeed_domain::{
    CacheError, CacheItemType, DtoPayload, DtoType, FetchError, Language, Lookup, Result,
    SportEventCacheSettings, Urn,
};
use tracing::{debug, instrument, warn};

use super::support::{fetch_languages, merge_under_lock, CacheDeps};
use crate::data_router_ports::{DataRouter, FetchResult};
use crate::export::ExportableItem;
use crate::health::CacheHealth;
use crate::items::{SportEventAttribute, SportEventCacheItem};
use crate::manager::{DtoEnvelope, Requester, SpecializedCache};
use crate::merge::DataSource;

const ACCEPTED: &[DtoType] = &[
    DtoType::SportEventSummary,
    DtoType::MatchSummary,
    DtoType::Fixture,
    DtoType::TournamentInfo,
    DtoType::Tournament,
];

const ITEM_TYPES: &[CacheItemType] = &[CacheItemType::SportEvent];

fn is_tournament_kind(id: &Urn) -> bool {
    matches!(id.kind(), "tournament" | "season" | "simple_tournament")
}

async fn fetch_event_payload(
    router: &dyn DataRouter,
    id: &Urn,
    language: &Language,
    source: DataSource,
) -> FetchResult<DtoPayload> {
    if source == DataSource::Fixture {
        return router.sport_event_fixture(id, language).await.map(DtoPayload::Fixture);
    }
    if is_tournament_kind(id) {
        return router.tournament_info(id, language).await.map(DtoPayload::TournamentInfo);
    }
    let summary = router.sport_event_summary(id, language).await?;
    Ok(if id.kind() == "match" {
        DtoPayload::MatchSummary(summary)
    } else {
        DtoPayload::SportEventSummary(summary)
    })
}

pub struct SportEventCache {
    store: ExpiringStore<Arc<SportEventCacheItem>>,
    locks: KeyLockManager,
    events: InFlightBag,
    fixtures: InFlightBag,
    deps: CacheDeps,
}

impl SportEventCache {
    pub fn new(settings: &SportEventCacheSettings, deps: CacheDeps) -> Self {
        let mut config = StoreConfig::builder(SPORT_EVENT_CACHE_NAME).absolute_ttl(settings.absolute_ttl);
        if let Some(capacity) = settings.max_capacity {
            config = config.max_capacity(capacity);
        }
        Self {
            store: ExpiringStore::new(config.build()),
            locks: KeyLockManager::new(SPORT_EVENT_CACHE_NAME, deps.lock_config),
            events: InFlightBag::new("sport_events"),
            fixtures: InFlightBag::new("fixtures"),
            deps,
        }
    }

    /// Cached item for `id`, registering an empty one when absent.
    ///
    /// Returns `None` for ids that are not sport events.
    pub fn get_item(&self, id: &Urn) -> Option<Arc<SportEventCacheItem>> {
        if !id.is_sport_event() {
            return None;
        }
        self.store.get_or_insert_with(id.to_string(), EvictionPriority::Normal, || {
            Arc::new(SportEventCacheItem::new(id.clone()))
        })
    }

    /// Cached item without creating one
    pub fn peek(&self, id: &Urn) -> Option<Arc<SportEventCacheItem>> {
        self.store.get(&id.to_string())
    }

    /// Make sure `languages` are loaded from `source`, fetching what is
    /// missing.
    pub async fn ensure_languages(
        &self,
        id: &Urn,
        languages: &[Language],
        source: DataSource,
    ) -> Lookup<Arc<SportEventCacheItem>> {
        let Some(item) = self.get_item(id) else {
            return Lookup::NotFound;
        };
        match self.load_missing(&item, languages, source).await {
            Ok(()) => Lookup::Found(item),
            Err(err) if err.is_not_found() => Lookup::NotFound,
            Err(err) => Lookup::Failed(err),
        }
    }

    /// Localised attribute for every requested language; absent values are
    /// empty strings.
    ///
    /// # Errors
    ///
    /// `CacheItemNotFound` for non-event ids, and for fetch failures when the
    /// exception strategy is `Throw`.
    #[instrument(skip(self, languages), fields(cache = SPORT_EVENT_CACHE_NAME))]
    pub async fn get_translated_value(
        &self,
        id: &Urn,
        attribute: SportEventAttribute,
        languages: &[Language],
        fetch_if_missing: bool,
    ) -> Result<BTreeMap<Language, String>> {
        let item = self.get_item(id).ok_or_else(|| CacheError::not_found(id))?;
        if fetch_if_missing {
            if let Err(err) = self.load_missing(&item, languages, DataSource::Summary).await {
                self.deps.handle_fetch_error(SPORT_EVENT_CACHE_NAME, &id.to_string(), err)?;
            }
        }
        Ok(languages
            .iter()
            .map(|language| {
                (language.clone(), item.translated(attribute, language).unwrap_or_default())
            })
            .collect())
    }

    /// Competitors of the event, loading the summary when needed
    pub async fn get_competitor_ids(&self, id: &Urn, languages: &[Language]) -> Result<Vec<Urn>> {
        let item = self.get_item(id).ok_or_else(|| CacheError::not_found(id))?;
        if let Err(err) = self.load_missing(&item, languages, DataSource::Summary).await {
            self.deps.handle_fetch_error(SPORT_EVENT_CACHE_NAME, &id.to_string(), err)?;
        }
        Ok(item.competitor_ids())
    }

    /// Drop one event; returns whether it was cached
    pub fn delete(&self, id: &Urn) -> bool {
        self.store.remove(&id.to_string()).is_some()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    async fn load_missing(
        &self,
        item: &Arc<SportEventCacheItem>,
        languages: &[Language],
        source: DataSource,
    ) -> FetchResult<()> {
        if item.missing_for(source, languages).is_empty() {
            return Ok(());
        }

        let bag = if source == DataSource::Fixture { &self.fixtures } else { &self.events };
        let key = item.id().to_string();
        let _slot = self.deps.dedup.claim(bag, &key).await;

        // Another caller may have loaded it while we waited
        let missing = item.missing_for(source, languages);
        if missing.is_empty() {
            return Ok(());
        }
        debug!(id = %key, ?missing, ?source, "fetching sport event");

        let router = Arc::clone(&self.deps.router);
        let id = item.id().clone();
        let results = fetch_languages(&missing, |language| {
            let router = Arc::clone(&router);
            let id = id.clone();
            async move { fetch_event_payload(router.as_ref(), &id, &language, source).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(payload) => {
                    let envelope = DtoEnvelope::new(key.clone(), payload, language)
                        .with_requester(Requester::SportEvent(Arc::clone(item)));
                    self.deps.deliver(envelope, self).await;
                }
                Err(err) => {
                    warn!(id = %key, %language, error = %err, "sport event fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn merge_into(
        &self,
        id: &Urn,
        payload: &DtoPayload,
        language: &Language,
        requester: Option<&Arc<SportEventCacheItem>>,
    ) -> bool {
        if !id.is_sport_event() {
            return false;
        }
        let requester = requester.filter(|item| item.id() == id);
        merge_under_lock(
            &self.locks,
            &self.store,
            id.to_string(),
            EvictionPriority::Normal,
            payload,
            language,
            requester,
            || SportEventCacheItem::new(id.clone()),
        )
        .await
    }
}

#[async_trait]
impl SpecializedCache for SportEventCache {
    fn name(&self) -> &str {
        SPORT_EVENT_CACHE_NAME
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        ACCEPTED
    }

    fn item_types(&self) -> &[CacheItemType] {
        ITEM_TYPES
    }

    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool> {
        let requester = match &envelope.requester {
            Some(Requester::SportEvent(item)) => Some(item),
            _ => None,
        };
        let language = &envelope.language;
        let payload = &envelope.payload;

        let merged = match payload {
            DtoPayload::SportEventSummary(summary) | DtoPayload::MatchSummary(summary) => {
                let mut merged = self.merge_into(&summary.id, payload, language, requester).await;
                if let Some(tournament) = &summary.tournament {
                    let referenced = DtoPayload::Tournament(tournament.clone());
                    merged |= self.merge_into(&tournament.id, &referenced, language, None).await;
                }
                merged
            }
            DtoPayload::Fixture(fixture) => {
                let mut merged =
                    self.merge_into(&fixture.event.id, payload, language, requester).await;
                if let Some(tournament) = &fixture.event.tournament {
                    let referenced = DtoPayload::Tournament(tournament.clone());
                    merged |= self.merge_into(&tournament.id, &referenced, language, None).await;
                }
                merged
            }
            DtoPayload::TournamentInfo(info) => {
                self.merge_into(&info.tournament.id, payload, language, requester).await
            }
            DtoPayload::Tournament(tournament) => {
                self.merge_into(&tournament.id, payload, language, requester).await
            }
            other => {
                return Err(CacheError::UnsupportedDto {
                    cache: SPORT_EVENT_CACHE_NAME.to_string(),
                    dto_type: other.dto_type(),
                })
            }
        };
        Ok(merged)
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::SportEvent) && self.store.remove(id).is_some()
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::SportEvent) && self.store.contains(id)
    }

    fn health(&self) -> CacheHealth {
        let stats = self.store.stats();
        CacheHealth::new(SPORT_EVENT_CACHE_NAME, !self.store.is_disposed(), stats.size)
            .with_detail("hits", stats.hits)
            .with_detail("misses", stats.misses)
            .with_detail("expirations", stats.expirations)
            .with_detail("held_locks", self.locks.held_count())
            .with_detail("in_flight", self.events.len() + self.fixtures.len())
    }

    async fn export(&self) -> Vec<ExportableItem> {
        let _global = self.locks.lock_all().await;
        let mut items: Vec<ExportableItem> = self
            .store
            .values()
            .into_iter()
            .map(|item| ExportableItem::SportEvent { id: item.id().clone(), data: item.snapshot() })
            .collect();
        items.sort_by_key(ExportableItem::key);
        items
    }

    async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let _global = self.locks.lock_all().await;
        let mut imported = 0;
        for item in items {
            if let ExportableItem::SportEvent { id, data } = item {
                let restored = SportEventCacheItem::from_data(id.clone(), data.clone());
                self.store.add(id.to_string(), Arc::new(restored), EvictionPriority::Normal);
                imported += 1;
            }
        }
        Ok(imported)
    }

    async fn delete_all(&self) {
        let _global = self.locks.lock_all().await;
        self.store.clear();
    }

    fn clean_locks(&self) -> usize {
        self.locks.clean()
    }

    fn dispose(&self) {
        self.store.dispose();
    }
}

impl std::fmt::Debug for SportEventCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SportEventCache")
            .field("store", &self.store)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
