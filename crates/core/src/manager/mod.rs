//! Type-routed fan-out of payloads to specialized caches
//!
//! Every payload is delivered to each registered cache that accepts its
//! `DtoType`, concurrently, and the manager waits for all of them. A failing
//! or panicking cache is logged and counted; it never affects the others.

mod envelope;
mod traits;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use oddsfeed_common::log_by_severity;
use oddsfeed_domain::{CacheError, CacheItemType, DtoPayload, Language, Result};
use parking_lot::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

pub use envelope::{DtoEnvelope, Requester};
pub use traits::{RefreshJob, SpecializedCache};

use crate::export::ExportableItem;
use crate::health::ManagerHealth;

/// Outcome of one dispatch, by cache name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Caches whose items changed
    pub merged: Vec<String>,
    /// Caches that accepted the payload but found nothing to merge
    pub ignored: Vec<String>,
    /// Caches that returned an error or panicked
    pub failed: Vec<String>,
}

impl DispatchReport {
    /// Number of caches the payload was delivered to
    pub fn delivered(&self) -> usize {
        self.merged.len() + self.ignored.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Registry and router of specialized caches
#[derive(Default)]
pub struct CacheManager {
    caches: RwLock<Vec<Arc<dyn SpecializedCache>>>,
    disposed: AtomicBool,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache.
    ///
    /// # Errors
    ///
    /// `CacheError::Registration` when the cache accepts no payload kinds or
    /// its name is already taken.
    pub fn register(&self, cache: Arc<dyn SpecializedCache>) -> Result<()> {
        if cache.accepted_dto_types().is_empty() {
            return Err(CacheError::Registration(format!(
                "cache {} accepts no dto types",
                cache.name()
            )));
        }
        let mut caches = self.caches.write();
        if caches.iter().any(|existing| existing.name() == cache.name()) {
            return Err(CacheError::Registration(format!(
                "cache {} is already registered",
                cache.name()
            )));
        }
        info!(
            cache = cache.name(),
            dto_types = ?cache.accepted_dto_types(),
            "cache registered"
        );
        caches.push(cache);
        Ok(())
    }

    /// Names of registered caches, in registration order
    pub fn registered_caches(&self) -> Vec<String> {
        self.caches.read().iter().map(|cache| cache.name().to_string()).collect()
    }

    fn snapshot(&self) -> Vec<Arc<dyn SpecializedCache>> {
        self.caches.read().clone()
    }

    /// Deliver a payload to every interested cache and wait for all of them
    pub async fn dispatch(&self, envelope: DtoEnvelope) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.disposed.load(Ordering::Acquire) {
            return report;
        }

        let dto_type = envelope.dto_type();
        let targets: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|cache| cache.accepted_dto_types().contains(&dto_type))
            .collect();
        if targets.is_empty() {
            debug!(id = %envelope.id, %dto_type, "no cache accepts dto");
            return report;
        }

        let envelope = Arc::new(envelope);
        let mut tasks = JoinSet::new();
        for cache in targets {
            let envelope = Arc::clone(&envelope);
            tasks.spawn(async move {
                let name = cache.name().to_string();
                let outcome = AssertUnwindSafe(cache.add_dto(&envelope)).catch_unwind().await;
                (name, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(Ok(true)))) => report.merged.push(name),
                Ok((name, Ok(Ok(false)))) => report.ignored.push(name),
                Ok((name, Ok(Err(err)))) => {
                    log_by_severity!(
                        &err,
                        cache = %name,
                        id = %envelope.id,
                        %dto_type,
                        language = %envelope.language,
                        error = %err,
                        "cache failed to merge dto"
                    );
                    report.failed.push(name);
                }
                Ok((name, Err(_))) => {
                    error!(cache = %name, id = %envelope.id, %dto_type, "cache panicked while merging dto");
                    report.failed.push(name);
                }
                Err(err) => {
                    error!(id = %envelope.id, %dto_type, error = %err, "dispatch task aborted");
                    report.failed.push("unknown".to_string());
                }
            }
        }

        report.merged.sort();
        report.ignored.sort();
        report.failed.sort();
        debug!(
            id = %envelope.id,
            %dto_type,
            merged = report.merged.len(),
            failed = report.failed.len(),
            "dto dispatched"
        );
        report
    }

    /// Entry point for payloads arriving from outside the caches
    pub async fn save_dto(
        &self,
        id: impl Into<String>,
        payload: DtoPayload,
        language: Language,
        requester: Option<Requester>,
    ) -> DispatchReport {
        let mut envelope = DtoEnvelope::new(id, payload, language);
        envelope.requester = requester;
        self.dispatch(envelope).await
    }

    /// Remove `id` from every cache handling `item_type`, except `originator`.
    ///
    /// Returns the names of the caches that held the item.
    pub fn invalidate(
        &self,
        id: &str,
        item_type: CacheItemType,
        originator: Option<&str>,
    ) -> Vec<String> {
        let mut removed_from = Vec::new();
        for cache in self.snapshot() {
            if originator == Some(cache.name()) {
                continue;
            }
            if !cache.item_types().iter().any(|handled| item_type.matches(*handled)) {
                continue;
            }
            if cache.delete_item(id, item_type) {
                removed_from.push(cache.name().to_string());
            }
        }
        debug!(id, %item_type, ?originator, caches = ?removed_from, "item invalidated");
        removed_from
    }

    /// Same as [`CacheManager::invalidate`]; used by external collaborators
    pub fn remove_cache_item(
        &self,
        id: &str,
        item_type: CacheItemType,
        originator: Option<&str>,
    ) -> Vec<String> {
        self.invalidate(id, item_type, originator)
    }

    pub fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        self.snapshot().iter().any(|cache| {
            cache.item_types().iter().any(|handled| item_type.matches(*handled))
                && cache.has_item(id, item_type)
        })
    }

    /// Snapshot of every exportable item of every cache
    pub async fn export(&self) -> Vec<ExportableItem> {
        let mut items = Vec::new();
        for cache in self.snapshot() {
            let exported = cache.export().await;
            debug!(cache = cache.name(), count = exported.len(), "cache exported");
            items.extend(exported);
        }
        items
    }

    /// Route snapshot items to the caches owning their kind.
    ///
    /// Returns the number of items restored.
    pub async fn import(&self, items: &[ExportableItem]) -> Result<usize> {
        let mut imported = 0;
        for cache in self.snapshot() {
            let owned: Vec<ExportableItem> = items
                .iter()
                .filter(|item| item.is_owned_by(cache.name(), cache.item_types()))
                .cloned()
                .collect();
            if owned.is_empty() {
                continue;
            }
            imported += cache.import(&owned).await?;
        }
        info!(offered = items.len(), imported, "snapshot imported");
        Ok(imported)
    }

    pub async fn delete_all(&self) {
        for cache in self.snapshot() {
            cache.delete_all().await;
        }
    }

    pub fn health(&self) -> ManagerHealth {
        ManagerHealth::from_caches(self.snapshot().iter().map(|cache| cache.health()).collect())
    }

    /// Drop stale lock records in every cache
    pub fn clean_locks(&self) -> usize {
        let removed: usize = self.snapshot().iter().map(|cache| cache.clean_locks()).sum();
        if removed > 0 {
            debug!(removed, "stale lock records cleaned");
        }
        removed
    }

    /// Dispose every cache; later dispatches are ignored
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for cache in self.snapshot() {
            cache.dispose();
        }
        info!("cache manager disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("caches", &self.registered_caches())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
