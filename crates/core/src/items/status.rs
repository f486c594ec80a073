use chrono::{DateTime, Utc};
use oddsfeed_domain::dto::SportEventStatusDto;
use oddsfeed_domain::Urn;

/// Latest live status of an event
///
/// Status is language independent and replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct SportEventStatusCacheItem {
    pub id: Urn,
    pub status: SportEventStatusDto,
    pub received_at: DateTime<Utc>,
}

impl SportEventStatusCacheItem {
    pub fn new(id: Urn, status: SportEventStatusDto) -> Self {
        Self { id, status, received_at: Utc::now() }
    }
}
