//! Sports and categories
//!
//! Loaded from the per-language "all sports" list. Entries are pinned; the
//! list is reloaded in the background for every configured language.

use std::sync::Arc;

use async_trait::async_trait;
use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
use oddsfeed_common::sync::{InFlightBag, KeyLockManager};
use oddsfeed_domain::constants::SPORT_DATA_CACHE_NAME;
use oddsfeed_domain::dto::{SportEntryDto, SportListDto};
use oddsfeed_domain::{
    CacheError, CacheItemType, DtoPayload, DtoType, FetchError, Language, Result, Urn,
};
use tracing::{debug, info, warn};

use super::support::{fetch_languages, merge_under_lock, CacheDeps, LoadedLanguages};
use crate::data_router_ports::FetchResult;
use crate::export::ExportableItem;
use crate::health::CacheHealth;
use crate::items::{CategoryCacheItem, SportCacheItem};
use crate::manager::{DtoEnvelope, RefreshJob, SpecializedCache};

const ACCEPTED: &[DtoType] = &[
    DtoType::SportList,
    DtoType::Sport,
    DtoType::Category,
    DtoType::Tournament,
    DtoType::TournamentInfo,
];

const ITEM_TYPES: &[CacheItemType] = &[CacheItemType::Sport, CacheItemType::Category];

/// Envelope id of sport list payloads
pub const SPORT_LIST_ID: &str = "all_sports";

pub struct SportDataCache {
    sports: ExpiringStore<Arc<SportCacheItem>>,
    categories: ExpiringStore<Arc<CategoryCacheItem>>,
    loaded: LoadedLanguages,
    locks: KeyLockManager,
    fetches: InFlightBag,
    deps: CacheDeps,
}

impl SportDataCache {
    pub fn new(deps: CacheDeps) -> Self {
        Self {
            sports: ExpiringStore::new(StoreConfig::unbounded("SportDataCache.sports")),
            categories: ExpiringStore::new(StoreConfig::unbounded("SportDataCache.categories")),
            loaded: LoadedLanguages::new(SPORT_DATA_CACHE_NAME),
            locks: KeyLockManager::new(SPORT_DATA_CACHE_NAME, deps.lock_config),
            fetches: InFlightBag::new("sport_lists"),
            deps,
        }
    }

    /// Every sport, with the list loaded in `languages`
    pub async fn get_sports(&self, languages: &[Language]) -> Result<Vec<Arc<SportCacheItem>>> {
        self.ensure_or_handle(languages).await?;
        let mut sports = self.sports.values();
        sports.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(sports)
    }

    pub async fn get_sport(
        &self,
        id: &Urn,
        languages: &[Language],
    ) -> Result<Option<Arc<SportCacheItem>>> {
        self.ensure_or_handle(languages).await?;
        Ok(self.sports.get(&id.to_string()))
    }

    pub async fn get_category(
        &self,
        id: &Urn,
        languages: &[Language],
    ) -> Result<Option<Arc<CategoryCacheItem>>> {
        self.ensure_or_handle(languages).await?;
        Ok(self.categories.get(&id.to_string()))
    }

    /// Load the sport list for every language of `languages` not loaded yet
    pub async fn ensure_languages(&self, languages: &[Language]) -> FetchResult<()> {
        if self.loaded.missing(languages).is_empty() {
            return Ok(());
        }
        let _slot = self.deps.dedup.claim(&self.fetches, SPORT_LIST_ID).await;
        let missing = self.loaded.missing(languages);
        if missing.is_empty() {
            return Ok(());
        }
        self.fetch_lists(&missing).await
    }

    /// Fetch the list for `languages` regardless of what is loaded
    pub async fn reload(&self, languages: &[Language]) -> FetchResult<()> {
        let _slot = self.deps.dedup.claim(&self.fetches, SPORT_LIST_ID).await;
        self.fetch_lists(languages).await
    }

    async fn ensure_or_handle(&self, languages: &[Language]) -> Result<()> {
        match self.ensure_languages(languages).await {
            Ok(()) => Ok(()),
            Err(err) => self.deps.handle_fetch_error(SPORT_DATA_CACHE_NAME, SPORT_LIST_ID, err),
        }
    }

    async fn fetch_lists(&self, languages: &[Language]) -> FetchResult<()> {
        debug!(?languages, "fetching sport list");
        let router = Arc::clone(&self.deps.router);
        let results = fetch_languages(languages, |language| {
            let router = Arc::clone(&router);
            async move { router.all_sports(&language).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(list) => {
                    let envelope =
                        DtoEnvelope::new(SPORT_LIST_ID, DtoPayload::SportList(list), language.clone());
                    self.deps.deliver(envelope, self).await;
                    self.loaded.mark(&language);
                }
                Err(err) => {
                    warn!(%language, error = %err, "sport list fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn merge_sport(&self, id: &Urn, payload: &DtoPayload, language: &Language) -> bool {
        merge_under_lock(
            &self.locks,
            &self.sports,
            id.to_string(),
            EvictionPriority::NeverRemove,
            payload,
            language,
            None,
            || SportCacheItem::new(id.clone()),
        )
        .await
    }

    async fn merge_category(&self, id: &Urn, payload: &DtoPayload, language: &Language) -> bool {
        merge_under_lock(
            &self.locks,
            &self.categories,
            id.to_string(),
            EvictionPriority::NeverRemove,
            payload,
            language,
            None,
            || CategoryCacheItem::new(id.clone()),
        )
        .await
    }

    async fn merge_entry(&self, entry: &SportEntryDto, language: &Language) -> bool {
        // One entry per payload keeps item merges from scanning the whole list
        let payload = DtoPayload::SportList(SportListDto { sports: vec![entry.clone()] });
        let mut merged = self.merge_sport(&entry.sport.id, &payload, language).await;
        for category in &entry.categories {
            merged |= self.merge_category(&category.id, &payload, language).await;
        }
        merged
    }
}

#[async_trait]
impl SpecializedCache for SportDataCache {
    fn name(&self) -> &str {
        SPORT_DATA_CACHE_NAME
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
            DtoPayload::SportList(list) => {
                let mut merged = false;
                for entry in &list.sports {
                    merged |= self.merge_entry(entry, language).await;
                }
                merged
            }
            DtoPayload::Sport(sport) => self.merge_sport(&sport.id, payload, language).await,
            DtoPayload::Category(category) => {
                let category_merged = self.merge_category(&category.id, payload, language).await;
                self.merge_sport(&category.sport_id, payload, language).await || category_merged
            }
            DtoPayload::Tournament(tournament) => {
                let category_merged =
                    self.merge_category(&tournament.category.id, payload, language).await;
                self.merge_sport(&tournament.sport.id, payload, language).await || category_merged
            }
            DtoPayload::TournamentInfo(info) => {
                let tournament = &info.tournament;
                let category_merged =
                    self.merge_category(&tournament.category.id, payload, language).await;
                self.merge_sport(&tournament.sport.id, payload, language).await || category_merged
            }
            other => {
                return Err(CacheError::UnsupportedDto {
                    cache: SPORT_DATA_CACHE_NAME.to_string(),
                    dto_type: other.dto_type(),
                })
            }
        };
        Ok(merged)
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        let sport = item_type.matches(CacheItemType::Sport) && self.sports.remove(id).is_some();
        let category =
            item_type.matches(CacheItemType::Category) && self.categories.remove(id).is_some();
        sport || category
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        (item_type.matches(CacheItemType::Sport) && self.sports.contains(id))
            || (item_type.matches(CacheItemType::Category) && self.categories.contains(id))
    }

    fn health(&self) -> CacheHealth {
        let sports = self.sports.count();
        let categories = self.categories.count();
        let healthy = !self.sports.is_disposed() && !self.categories.is_disposed();
        CacheHealth::new(SPORT_DATA_CACHE_NAME, healthy, sports + categories)
            .with_detail("sports", sports)
            .with_detail("categories", categories)
            .with_detail("loaded_languages", self.loaded.count())
    }

    async fn export(&self) -> Vec<ExportableItem> {
        let _global = self.locks.lock_all().await;
        let mut items: Vec<ExportableItem> = self
            .sports
            .values()
            .into_iter()
            .map(|item| ExportableItem::Sport { id: item.id().clone(), data: item.snapshot() })
            .chain(
                self.categories
                    .values()
                    .into_iter()
                    .map(|item| ExportableItem::Category { id: item.id().clone(), data: item.snapshot() }),
            )
            .collect();
        items.extend(self.loaded.export(SPORT_DATA_CACHE_NAME));
        items.sort_by_key(ExportableItem::key);
        items
    }

    async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let _global = self.locks.lock_all().await;
        let mut imported = 0;
        for item in items {
            if self.loaded.import(SPORT_DATA_CACHE_NAME, item) {
                imported += 1;
                continue;
            }
            match item {
                ExportableItem::Sport { id, data } => {
                    let restored = SportCacheItem::from_data(id.clone(), data.clone());
                    self.sports.add(id.to_string(), Arc::new(restored), EvictionPriority::NeverRemove);
                    imported += 1;
                }
                ExportableItem::Category { id, data } => {
                    let restored = CategoryCacheItem::from_data(id.clone(), data.clone());
                    self.categories.add(
                        id.to_string(),
                        Arc::new(restored),
                        EvictionPriority::NeverRemove,
                    );
                    imported += 1;
                }
                _ => {}
            }
        }
        Ok(imported)
    }

    async fn delete_all(&self) {
        let _global = self.locks.lock_all().await;
        self.sports.clear();
        self.categories.clear();
        self.loaded.clear();
    }

    fn clean_locks(&self) -> usize {
        self.locks.clean()
    }

    fn dispose(&self) {
        self.sports.dispose();
        self.categories.dispose();
        self.loaded.dispose();
    }
}

#[async_trait]
impl RefreshJob for SportDataCache {
    fn name(&self) -> &str {
        SPORT_DATA_CACHE_NAME
    }

    async fn refresh(&self) -> Result<()> {
        let languages = self.deps.languages.clone();
        self.reload(&languages)
            .await
            .map_err(|err| CacheError::fetch_failed(SPORT_LIST_ID, err))?;
        info!(cache = SPORT_DATA_CACHE_NAME, languages = languages.len(), "sport list refreshed");
        Ok(())
    }
}

impl std::fmt::Debug for SportDataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SportDataCache")
            .field("sports", &self.sports)
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}
