//! Market and variant descriptions
//!
//! - [`InvariantMarketCache`]: every market description, loaded as one list
//!   per language and pinned
//! - [`VariantMarketCache`]: single-variant descriptions fetched on demand,
//!   sliding expiration
//! - [`VariantDescriptionCache`]: variant outcome lists, pinned

use std::sync::Arc;

use async_trait::async_trait;
use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
use oddsfeed_common::sync::{InFlightBag, KeyLockManager};
use oddsfeed_domain::constants::{
    INVARIANT_MARKET_CACHE_NAME, VARIANT_DESCRIPTION_CACHE_NAME, VARIANT_MARKET_CACHE_NAME,
};
use oddsfeed_domain::dto::{MarketDescriptionListDto, VariantDescriptionListDto};
use oddsfeed_domain::{
    CacheError, CacheItemType, DtoPayload, DtoType, FetchError, Language, MarketCacheSettings,
    Result,
};
use tracing::{debug, info, warn};

use super::support::{fetch_languages, merge_under_lock, CacheDeps, LoadedLanguages};
use crate::data_router_ports::FetchResult;
use crate::export::ExportableItem;
use crate::health::CacheHealth;
use crate::items::{MarketDescriptionCacheItem, VariantDescriptionCacheItem};
use crate::manager::{DtoEnvelope, RefreshJob, SpecializedCache};
use crate::merge::CultureMerge;

/// Envelope id of invariant market list payloads
pub const MARKET_LIST_ID: &str = "market_descriptions";
/// Envelope id of variant description list payloads
pub const VARIANT_LIST_ID: &str = "variant_descriptions";

const MARKET_ITEM_TYPES: &[CacheItemType] = &[CacheItemType::MarketDescription];

/// Store key of a single-variant market description
pub fn variant_market_key(market_id: u32, variant: &str) -> String {
    format!("{market_id}?{variant}")
}

fn unsupported(cache: &str, payload: &DtoPayload) -> CacheError {
    CacheError::UnsupportedDto { cache: cache.to_string(), dto_type: payload.dto_type() }
}

// ============================================================================
// Invariant market descriptions
// ============================================================================

pub struct InvariantMarketCache {
    store: ExpiringStore<Arc<MarketDescriptionCacheItem>>,
    loaded: LoadedLanguages,
    locks: KeyLockManager,
    fetches: InFlightBag,
    deps: CacheDeps,
}

impl InvariantMarketCache {
    pub fn new(deps: CacheDeps) -> Self {
        Self {
            store: ExpiringStore::new(StoreConfig::unbounded(INVARIANT_MARKET_CACHE_NAME)),
            loaded: LoadedLanguages::new(INVARIANT_MARKET_CACHE_NAME),
            locks: KeyLockManager::new(INVARIANT_MARKET_CACHE_NAME, deps.lock_config),
            fetches: InFlightBag::new("market_lists"),
            deps,
        }
    }

    /// Description of market `id`, with the list loaded in `languages`
    pub async fn get_market(
        &self,
        id: u32,
        languages: &[Language],
    ) -> Result<Option<Arc<MarketDescriptionCacheItem>>> {
        if let Err(err) = self.ensure_languages(languages).await {
            self.deps.handle_fetch_error(INVARIANT_MARKET_CACHE_NAME, MARKET_LIST_ID, err)?;
        }
        Ok(self.store.get(&id.to_string()))
    }

    pub async fn ensure_languages(&self, languages: &[Language]) -> FetchResult<()> {
        if self.loaded.missing(languages).is_empty() {
            return Ok(());
        }
        let _slot = self.deps.dedup.claim(&self.fetches, MARKET_LIST_ID).await;
        let missing = self.loaded.missing(languages);
        if missing.is_empty() {
            return Ok(());
        }
        self.fetch_lists(&missing).await
    }

    /// Fetch the lists again, through the same slot foreground callers use
    pub async fn reload(&self, languages: &[Language]) -> FetchResult<()> {
        let _slot = self.deps.dedup.claim(&self.fetches, MARKET_LIST_ID).await;
        self.fetch_lists(languages).await
    }

    async fn fetch_lists(&self, languages: &[Language]) -> FetchResult<()> {
        debug!(?languages, "fetching market descriptions");
        let router = Arc::clone(&self.deps.router);
        let results = fetch_languages(languages, |language| {
            let router = Arc::clone(&router);
            async move { router.market_descriptions(&language).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(list) => {
                    let payload = DtoPayload::MarketDescriptionList(list);
                    let envelope = DtoEnvelope::new(MARKET_LIST_ID, payload, language.clone());
                    self.deps.deliver(envelope, self).await;
                    self.loaded.mark(&language);
                }
                Err(err) => {
                    warn!(%language, error = %err, "market description fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl SpecializedCache for InvariantMarketCache {
    fn name(&self) -> &str {
        INVARIANT_MARKET_CACHE_NAME
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        &[DtoType::MarketDescriptionList]
    }

    fn item_types(&self) -> &[CacheItemType] {
        MARKET_ITEM_TYPES
    }

    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool> {
        let DtoPayload::MarketDescriptionList(list) = &envelope.payload else {
            return Err(unsupported(INVARIANT_MARKET_CACHE_NAME, &envelope.payload));
        };
        let mut merged = false;
        for market in list.markets.iter().filter(|market| market.variant.is_none()) {
            let payload = DtoPayload::MarketDescriptionList(MarketDescriptionListDto {
                markets: vec![market.clone()],
            });
            merged |= merge_under_lock(
                &self.locks,
                &self.store,
                market.id.to_string(),
                EvictionPriority::NeverRemove,
                &payload,
                &envelope.language,
                None,
                || MarketDescriptionCacheItem::new(market.id, None),
            )
            .await;
        }
        Ok(merged)
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::MarketDescription) && self.store.remove(id).is_some()
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::MarketDescription) && self.store.contains(id)
    }

    fn health(&self) -> CacheHealth {
        CacheHealth::new(INVARIANT_MARKET_CACHE_NAME, !self.store.is_disposed(), self.store.count())
            .with_detail("loaded_languages", self.loaded.count())
    }

    async fn export(&self) -> Vec<ExportableItem> {
        let _global = self.locks.lock_all().await;
        let mut items: Vec<ExportableItem> = self
            .store
            .values()
            .into_iter()
            .map(|item| ExportableItem::MarketDescription {
                key: item.id().to_string(),
                data: item.snapshot(),
            })
            .collect();
        items.extend(self.loaded.export(INVARIANT_MARKET_CACHE_NAME));
        items.sort_by_key(ExportableItem::key);
        items
    }

    async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let _global = self.locks.lock_all().await;
        let mut imported = 0;
        for item in items {
            if self.loaded.import(INVARIANT_MARKET_CACHE_NAME, item) {
                imported += 1;
            } else if let ExportableItem::MarketDescription { key, data } = item {
                if data.variant.is_some() {
                    continue;
                }
                let restored = MarketDescriptionCacheItem::from_data(data.clone());
                self.store.add(key.clone(), Arc::new(restored), EvictionPriority::NeverRemove);
                imported += 1;
            }
        }
        Ok(imported)
    }

    async fn delete_all(&self) {
        let _global = self.locks.lock_all().await;
        self.store.clear();
        self.loaded.clear();
    }

    fn clean_locks(&self) -> usize {
        self.locks.clean()
    }

    fn dispose(&self) {
        self.store.dispose();
        self.loaded.dispose();
    }
}

#[async_trait]
impl RefreshJob for InvariantMarketCache {
    fn name(&self) -> &str {
        INVARIANT_MARKET_CACHE_NAME
    }

    async fn refresh(&self) -> Result<()> {
        let languages = self.deps.languages.clone();
        self.reload(&languages)
            .await
            .map_err(|err| CacheError::fetch_failed(MARKET_LIST_ID, err))?;
        info!(cache = INVARIANT_MARKET_CACHE_NAME, languages = languages.len(), "market descriptions refreshed");
        Ok(())
    }
}

// ============================================================================
// Single-variant market descriptions
// ============================================================================

pub struct VariantMarketCache {
    store: ExpiringStore<Arc<MarketDescriptionCacheItem>>,
    locks: KeyLockManager,
    fetches: InFlightBag,
    deps: CacheDeps,
}

impl VariantMarketCache {
    pub fn new(settings: &MarketCacheSettings, deps: CacheDeps) -> Self {
        let mut config =
            StoreConfig::builder(VARIANT_MARKET_CACHE_NAME).sliding_ttl(settings.variant_sliding_ttl);
        if let Some(capacity) = settings.variant_max_capacity {
            config = config.max_capacity(capacity);
        }
        Self {
            store: ExpiringStore::new(config.build()),
            locks: KeyLockManager::new(VARIANT_MARKET_CACHE_NAME, deps.lock_config),
            fetches: InFlightBag::new("variant_markets"),
            deps,
        }
    }

    /// Description of `market_id` for one variant value
    ///
    /// # Errors
    ///
    /// `CacheItemNotFound` for fetch failures when the exception strategy is
    /// `Throw`.
    pub async fn get_variant_market(
        &self,
        market_id: u32,
        variant: &str,
        languages: &[Language],
    ) -> Result<Arc<MarketDescriptionCacheItem>> {
        let key = variant_market_key(market_id, variant);
        let item = self
            .store
            .get_or_insert_with(key.clone(), EvictionPriority::Normal, || {
                Arc::new(MarketDescriptionCacheItem::new(market_id, Some(variant.to_string())))
            })
            .ok_or_else(|| CacheError::not_found(&key))?;
        if let Err(err) = self.load_missing(&item, &key, variant, languages).await {
            self.deps.handle_fetch_error(VARIANT_MARKET_CACHE_NAME, &key, err)?;
        }
        Ok(item)
    }

    async fn load_missing(
        &self,
        item: &Arc<MarketDescriptionCacheItem>,
        key: &str,
        variant: &str,
        languages: &[Language],
    ) -> FetchResult<()> {
        if item.has_translations_for(languages) {
            return Ok(());
        }
        let _slot = self.deps.dedup.claim(&self.fetches, key).await;
        let missing = item.missing_languages(languages);
        if missing.is_empty() {
            return Ok(());
        }
        debug!(key, ?missing, "fetching variant market description");

        let router = Arc::clone(&self.deps.router);
        let market_id = item.id();
        let results = fetch_languages(&missing, |language| {
            let router = Arc::clone(&router);
            let variant = variant.to_string();
            async move { router.variant_market_description(market_id, &variant, &language).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(mut market) => {
                    // Upstream omits the variant on single-variant responses
                    market.variant.get_or_insert_with(|| variant.to_string());
                    let payload = DtoPayload::VariantMarketDescription(market);
                    self.deps.deliver(DtoEnvelope::new(key, payload, language), self).await;
                }
                Err(err) => {
                    warn!(key, %language, error = %err, "variant market fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl SpecializedCache for VariantMarketCache {
    fn name(&self) -> &str {
        VARIANT_MARKET_CACHE_NAME
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        &[DtoType::VariantMarketDescription]
    }

    fn item_types(&self) -> &[CacheItemType] {
        MARKET_ITEM_TYPES
    }

    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool> {
        let DtoPayload::VariantMarketDescription(market) = &envelope.payload else {
            return Err(unsupported(VARIANT_MARKET_CACHE_NAME, &envelope.payload));
        };
        let Some(variant) = market.variant.as_deref() else {
            return Ok(false);
        };
        let merged = merge_under_lock(
            &self.locks,
            &self.store,
            variant_market_key(market.id, variant),
            EvictionPriority::Normal,
            &envelope.payload,
            &envelope.language,
            None,
            || MarketDescriptionCacheItem::new(market.id, Some(variant.to_string())),
        )
        .await;
        Ok(merged)
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::MarketDescription) && self.store.remove(id).is_some()
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::MarketDescription) && self.store.contains(id)
    }

    fn health(&self) -> CacheHealth {
        let stats = self.store.stats();
        CacheHealth::new(VARIANT_MARKET_CACHE_NAME, !self.store.is_disposed(), stats.size)
            .with_detail("hit_rate", format!("{:.2}", stats.hit_rate()))
            .with_detail("in_flight", self.fetches.len())
    }

    async fn export(&self) -> Vec<ExportableItem> {
        let _global = self.locks.lock_all().await;
        let mut items: Vec<ExportableItem> = self
            .store
            .values()
            .into_iter()
            .filter_map(|item| {
                let data = item.snapshot();
                let key = variant_market_key(data.id, data.variant.as_deref()?);
                Some(ExportableItem::MarketDescription { key, data })
            })
            .collect();
        items.sort_by_key(ExportableItem::key);
        items
    }

    async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let _global = self.locks.lock_all().await;
        let mut imported = 0;
        for item in items {
            if let ExportableItem::MarketDescription { key, data } = item {
                if data.variant.is_none() {
                    continue;
                }
                let restored = MarketDescriptionCacheItem::from_data(data.clone());
                self.store.add(key.clone(), Arc::new(restored), EvictionPriority::Normal);
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

// ============================================================================
// Variant descriptions
// ============================================================================

pub struct VariantDescriptionCache {
    store: ExpiringStore<Arc<VariantDescriptionCacheItem>>,
    loaded: LoadedLanguages,
    locks: KeyLockManager,
    fetches: InFlightBag,
    deps: CacheDeps,
}

impl VariantDescriptionCache {
    pub fn new(deps: CacheDeps) -> Self {
        Self {
            store: ExpiringStore::new(StoreConfig::unbounded(VARIANT_DESCRIPTION_CACHE_NAME)),
            loaded: LoadedLanguages::new(VARIANT_DESCRIPTION_CACHE_NAME),
            locks: KeyLockManager::new(VARIANT_DESCRIPTION_CACHE_NAME, deps.lock_config),
            fetches: InFlightBag::new("variant_lists"),
            deps,
        }
    }

    pub async fn get_variant_description(
        &self,
        id: &str,
        languages: &[Language],
    ) -> Result<Option<Arc<VariantDescriptionCacheItem>>> {
        if let Err(err) = self.ensure_languages(languages).await {
            self.deps.handle_fetch_error(VARIANT_DESCRIPTION_CACHE_NAME, VARIANT_LIST_ID, err)?;
        }
        Ok(self.store.get(id))
    }

    pub async fn ensure_languages(&self, languages: &[Language]) -> FetchResult<()> {
        if self.loaded.missing(languages).is_empty() {
            return Ok(());
        }
        let _slot = self.deps.dedup.claim(&self.fetches, VARIANT_LIST_ID).await;
        let missing = self.loaded.missing(languages);
        if missing.is_empty() {
            return Ok(());
        }
        self.fetch_lists(&missing).await
    }

    pub async fn reload(&self, languages: &[Language]) -> FetchResult<()> {
        let _slot = self.deps.dedup.claim(&self.fetches, VARIANT_LIST_ID).await;
        self.fetch_lists(languages).await
    }

    async fn fetch_lists(&self, languages: &[Language]) -> FetchResult<()> {
        let router = Arc::clone(&self.deps.router);
        let results = fetch_languages(languages, |language| {
            let router = Arc::clone(&router);
            async move { router.variant_descriptions(&language).await }
        })
        .await;

        let mut first_error: Option<FetchError> = None;
        for (language, result) in results {
            match result {
                Ok(list) => {
                    let payload = DtoPayload::VariantDescriptionList(list);
                    let envelope = DtoEnvelope::new(VARIANT_LIST_ID, payload, language.clone());
                    self.deps.deliver(envelope, self).await;
                    self.loaded.mark(&language);
                }
                Err(err) => {
                    warn!(%language, error = %err, "variant description fetch failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl SpecializedCache for VariantDescriptionCache {
    fn name(&self) -> &str {
        VARIANT_DESCRIPTION_CACHE_NAME
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        &[DtoType::VariantDescriptionList]
    }

    fn item_types(&self) -> &[CacheItemType] {
        &[CacheItemType::VariantDescription]
    }

    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool> {
        let DtoPayload::VariantDescriptionList(list) = &envelope.payload else {
            return Err(unsupported(VARIANT_DESCRIPTION_CACHE_NAME, &envelope.payload));
        };
        let mut merged = false;
        for variant in &list.variants {
            let payload = DtoPayload::VariantDescriptionList(VariantDescriptionListDto {
                variants: vec![variant.clone()],
            });
            merged |= merge_under_lock(
                &self.locks,
                &self.store,
                variant.id.clone(),
                EvictionPriority::NeverRemove,
                &payload,
                &envelope.language,
                None,
                || VariantDescriptionCacheItem::new(variant.id.as_str()),
            )
            .await;
        }
        Ok(merged)
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::VariantDescription) && self.store.remove(id).is_some()
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::VariantDescription) && self.store.contains(id)
    }

    fn health(&self) -> CacheHealth {
        CacheHealth::new(VARIANT_DESCRIPTION_CACHE_NAME, !self.store.is_disposed(), self.store.count())
            .with_detail("loaded_languages", self.loaded.count())
    }

    async fn export(&self) -> Vec<ExportableItem> {
        let _global = self.locks.lock_all().await;
        let mut items: Vec<ExportableItem> = self
            .store
            .values()
            .into_iter()
            .map(|item| ExportableItem::VariantDescription {
                id: item.id().to_string(),
                data: item.snapshot(),
            })
            .collect();
        items.extend(self.loaded.export(VARIANT_DESCRIPTION_CACHE_NAME));
        items.sort_by_key(ExportableItem::key);
        items
    }

    async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let _global = self.locks.lock_all().await;
        let mut imported = 0;
        for item in items {
            if self.loaded.import(VARIANT_DESCRIPTION_CACHE_NAME, item) {
                imported += 1;
            } else if let ExportableItem::VariantDescription { id, data } = item {
                let restored = VariantDescriptionCacheItem::from_data(id.as_str(), data.clone());
                self.store.add(id.clone(), Arc::new(restored), EvictionPriority::NeverRemove);
                imported += 1;
            }
        }
        Ok(imported)
    }

    async fn delete_all(&self) {
        let _global = self.locks.lock_all().await;
        self.store.clear();
        self.loaded.clear();
    }

    fn clean_locks(&self) -> usize {
        self.locks.clean()
    }

    fn dispose(&self) {
        self.store.dispose();
        self.loaded.dispose();
    }
}

#[async_trait]
impl RefreshJob for VariantDescriptionCache {
    fn name(&self) -> &str {
        VARIANT_DESCRIPTION_CACHE_NAME
    }

    async fn refresh(&self) -> Result<()> {
        let languages = self.deps.languages.clone();
        self.reload(&languages)
            .await
            .map_err(|err| CacheError::fetch_failed(VARIANT_LIST_ID, err))?;
        info!(cache = VARIANT_DESCRIPTION_CACHE_NAME, "variant descriptions refreshed");
        Ok(())
    }
}
