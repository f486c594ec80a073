//! Live status of sport events
//!
//! Status is not localised, so there is nothing to merge: the newest status
//! replaces the cached one. Statuses are short-lived and never exported.
//! Writes hold the event's key lock; `delete_all` takes the global lock.

use async_trait::async_trait;
use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
use oddsfeed_common::sync::{KeyLockManager, LockConfig};
use oddsfeed_domain::constants::SPORT_EVENT_STATUS_CACHE_NAME;
use oddsfeed_domain::dto::SportEventStatusDto;
use oddsfeed_domain::{
    CacheError, CacheItemType, DtoPayload, DtoType, Result, SportEventCacheSettings, Urn,
};
use tracing::trace;

use crate::export::ExportableItem;
use crate::health::CacheHealth;
use crate::items::SportEventStatusCacheItem;
use crate::manager::{DtoEnvelope, SpecializedCache};

const ACCEPTED: &[DtoType] =
    &[DtoType::SportEventStatus, DtoType::SportEventSummary, DtoType::MatchSummary];

const ITEM_TYPES: &[CacheItemType] = &[CacheItemType::SportEvent];

pub struct SportEventStatusCache {
    store: ExpiringStore<SportEventStatusCacheItem>,
    locks: KeyLockManager,
}

impl SportEventStatusCache {
    pub fn new(settings: &SportEventCacheSettings, lock_config: LockConfig) -> Self {
        Self {
            store: ExpiringStore::new(StoreConfig::absolute(
                SPORT_EVENT_STATUS_CACHE_NAME,
                settings.status_ttl,
            )),
            locks: KeyLockManager::new(SPORT_EVENT_STATUS_CACHE_NAME, lock_config),
        }
    }

    /// Last known status; `None` once it expired
    pub fn get_status(&self, id: &Urn) -> Option<SportEventStatusCacheItem> {
        self.store.get(&id.to_string())
    }

    async fn replace(&self, id: &Urn, status: &SportEventStatusDto) {
        let _guard = self.locks.lock(&id.to_string()).await;
        trace!(id = %id, status = %status.status, "status replaced");
        self.store.add(
            id.to_string(),
            SportEventStatusCacheItem::new(id.clone(), status.clone()),
            EvictionPriority::Normal,
        );
    }
}

#[async_trait]
impl SpecializedCache for SportEventStatusCache {
    fn name(&self) -> &str {
        SPORT_EVENT_STATUS_CACHE_NAME
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        ACCEPTED
    }

    fn item_types(&self) -> &[CacheItemType] {
        ITEM_TYPES
    }

    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool> {
        match &envelope.payload {
            DtoPayload::SportEventStatus(status) => {
                let id: Urn = envelope.id.parse()?;
                self.replace(&id, status).await;
                Ok(true)
            }
            DtoPayload::SportEventSummary(summary) | DtoPayload::MatchSummary(summary) => {
                match &summary.status {
                    Some(status) => {
                        self.replace(&summary.id, status).await;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            other => Err(CacheError::UnsupportedDto {
                cache: SPORT_EVENT_STATUS_CACHE_NAME.to_string(),
                dto_type: other.dto_type(),
            }),
        }
    }

    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::SportEvent) && self.store.remove(id).is_some()
    }

    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool {
        item_type.matches(CacheItemType::SportEvent) && self.store.contains(id)
    }

    fn health(&self) -> CacheHealth {
        let stats = self.store.stats();
        CacheHealth::new(SPORT_EVENT_STATUS_CACHE_NAME, !self.store.is_disposed(), stats.size)
            .with_detail("expirations", stats.expirations)
            .with_detail("held_locks", self.locks.held_count())
    }

    async fn export(&self) -> Vec<ExportableItem> {
        Vec::new()
    }

    async fn import(&self, _items: &[ExportableItem]) -> Result<usize> {
        Ok(0)
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
