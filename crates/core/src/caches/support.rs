//! Collaborators shared by the specialized caches

use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::join_all;
use oddsfeed_common::log_by_severity;
use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
use oddsfeed_common::sync::{FetchDeduplicator, KeyLockManager, LockConfig};
use oddsfeed_domain::{
    CacheError, CacheSettings, DtoPayload, ExceptionHandlingStrategy, FetchError, Language,
};
use tracing::warn;

use crate::data_router_ports::{DataRouter, FetchResult};
use crate::export::ExportableItem;
use crate::manager::{CacheManager, DtoEnvelope, SpecializedCache};
use crate::merge::CultureMerge;

/// Dependencies handed to every specialized cache
#[derive(Clone)]
pub struct CacheDeps {
    pub router: Arc<dyn DataRouter>,
    /// Non-owning; the manager owns the caches
    pub manager: Weak<CacheManager>,
    pub lock_config: LockConfig,
    pub dedup: FetchDeduplicator,
    pub strategy: ExceptionHandlingStrategy,
    /// Languages loaded by background refresh
    pub languages: Vec<Language>,
}

impl CacheDeps {
    pub fn new(
        router: Arc<dyn DataRouter>,
        manager: &Arc<CacheManager>,
        settings: &CacheSettings,
    ) -> Self {
        let locking = &settings.locking;
        Self {
            router,
            manager: Arc::downgrade(manager),
            lock_config: LockConfig::new(locking.poll_interval, locking.staleness_ceiling),
            dedup: FetchDeduplicator::new(LockConfig::new(
                locking.poll_interval,
                locking.dedup_timeout,
            )),
            strategy: settings.exception_strategy,
            languages: settings.all_languages(),
        }
    }

    /// Route a fetched payload through the manager so every interested cache
    /// sees it; merges locally when the manager is gone.
    pub(crate) async fn deliver(&self, envelope: DtoEnvelope, local: &dyn SpecializedCache) {
        match self.manager.upgrade() {
            Some(manager) => {
                manager.dispatch(envelope).await;
            }
            None => {
                if let Err(err) = local.add_dto(&envelope).await {
                    warn!(cache = local.name(), id = %envelope.id, error = %err, "local merge failed");
                }
            }
        }
    }

    /// Apply the exception strategy to a failed fetch
    pub(crate) fn handle_fetch_error(
        &self,
        cache: &str,
        id: &str,
        err: FetchError,
    ) -> Result<(), CacheError> {
        match self.strategy {
            ExceptionHandlingStrategy::Throw => Err(CacheError::fetch_failed(id, err)),
            ExceptionHandlingStrategy::Catch => {
                log_by_severity!(&err, cache, id, error = %err, "fetch failed, serving partial data");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for CacheDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDeps")
            .field("lock_config", &self.lock_config)
            .field("strategy", &self.strategy)
            .field("languages", &self.languages)
            .finish_non_exhaustive()
    }
}

/// Run one fetch per language concurrently, keeping the language next to
/// each result
pub(crate) async fn fetch_languages<T, F, Fut>(
    languages: &[Language],
    fetch: F,
) -> Vec<(Language, FetchResult<T>)>
where
    F: Fn(Language) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    join_all(languages.iter().cloned().map(|language| {
        let pending = fetch(language.clone());
        async move { (language, pending.await) }
    }))
    .await
}

/// Merge `payload` into the item stored under `key` while holding its
/// per-key lock.
///
/// The requester (the instance a fetch was issued for) is merged first and
/// becomes the stored instance when the key is vacant; otherwise the stored
/// instance is merged as well, so callers holding either one see the data.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn merge_under_lock<T>(
    locks: &KeyLockManager,
    store: &ExpiringStore<Arc<T>>,
    key: String,
    priority: EvictionPriority,
    payload: &DtoPayload,
    language: &Language,
    requester: Option<&Arc<T>>,
    create: impl FnOnce() -> T + Send,
) -> bool
where
    T: CultureMerge + Send + Sync + 'static,
{
    let _guard = locks.lock(&key).await;

    let mut merged = requester.is_some_and(|item| item.merge_dto(payload, language));
    let stored = store.get_or_insert_with(key, priority, || match requester {
        Some(item) => Arc::clone(item),
        None => Arc::new(create()),
    });
    if let Some(stored) = stored {
        if !requester.is_some_and(|item| Arc::ptr_eq(item, &stored)) {
            merged |= stored.merge_dto(payload, language);
        }
    }
    merged
}

/// Languages for which a whole reference list has been loaded
///
/// Backed by a pinned store keyed by language code.
pub(crate) struct LoadedLanguages {
    store: ExpiringStore<Language>,
}

impl LoadedLanguages {
    pub(crate) fn new(name: &str) -> Self {
        Self { store: ExpiringStore::new(StoreConfig::unbounded(format!("{name}.languages"))) }
    }

    pub(crate) fn missing(&self, wanted: &[Language]) -> Vec<Language> {
        let mut missing: Vec<Language> = Vec::new();
        for language in wanted {
            if !self.store.contains(language.as_str()) && !missing.contains(language) {
                missing.push(language.clone());
            }
        }
        missing
    }

    pub(crate) fn mark(&self, language: &Language) {
        self.store.add(language.as_str(), language.clone(), EvictionPriority::NeverRemove);
    }

    pub(crate) fn count(&self) -> usize {
        self.store.count()
    }

    /// Loaded languages in code order
    pub(crate) fn languages(&self) -> Vec<Language> {
        let mut languages = self.store.values();
        languages.sort();
        languages
    }

    /// Snapshot entry for `cache`; `None` when nothing is loaded
    pub(crate) fn export(&self, cache: &str) -> Option<ExportableItem> {
        let languages = self.languages();
        (!languages.is_empty())
            .then(|| ExportableItem::LoadedLanguages { cache: cache.to_string(), languages })
    }

    /// Restore markers from a snapshot entry addressed to `cache`
    pub(crate) fn import(&self, cache: &str, item: &ExportableItem) -> bool {
        match item {
            ExportableItem::LoadedLanguages { cache: owner, languages } if owner == cache => {
                for language in languages {
                    self.mark(language);
                }
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&self) {
        self.store.clear();
    }

    pub(crate) fn dispose(&self) {
        self.store.dispose();
    }
}
