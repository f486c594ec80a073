use async_trait::async_trait;
use oddsfeed_domain::{CacheItemType, DtoType, Result};

use super::envelope::DtoEnvelope;
use crate::export::ExportableItem;
use crate::health::CacheHealth;

/// A cache registered with the [`CacheManager`](super::CacheManager)
#[async_trait]
pub trait SpecializedCache: Send + Sync {
    /// Unique name, used for attribution and logging
    fn name(&self) -> &str;

    /// Payload kinds routed to this cache; never empty
    fn accepted_dto_types(&self) -> &[DtoType];

    /// Item kinds this cache owns, for invalidation and `has_item`
    fn item_types(&self) -> &[CacheItemType];

    /// Merge one payload; returns whether any item changed
    async fn add_dto(&self, envelope: &DtoEnvelope) -> Result<bool>;

    /// Drop the item; returns whether it was present
    fn delete_item(&self, id: &str, item_type: CacheItemType) -> bool;

    /// Whether the item is cached, without fetching
    fn has_item(&self, id: &str, item_type: CacheItemType) -> bool;

    /// Item count and lock statistics for health reports
    fn health(&self) -> CacheHealth;

    /// Snapshot of every item, taken under the cache's global lock
    async fn export(&self) -> Vec<ExportableItem>;

    /// Restore items of the kinds this cache owns; returns how many were taken
    async fn import(&self, items: &[ExportableItem]) -> Result<usize>;

    /// Remove every item under the global lock
    async fn delete_all(&self);

    /// Drop stale lock records; returns how many were removed
    fn clean_locks(&self) -> usize;

    /// Clear and release the backing stores
    fn dispose(&self);
}

/// Periodic background work, run by the refresh scheduler
#[async_trait]
pub trait RefreshJob: Send + Sync {
    /// Job name used in logs and refresh reports
    fn name(&self) -> &str;

    /// Run one round of the job
    async fn refresh(&self) -> Result<()>;
}
