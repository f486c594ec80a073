use std::fmt;
use std::sync::Arc;

use oddsfeed_domain::{DtoPayload, DtoType, Language};

use crate::items::{CompetitorCacheItem, PlayerCacheItem, SportEventCacheItem};

/// Item on whose behalf a fetch was issued
///
/// The owning cache merges into this exact instance first, so a caller
/// holding it sees the data even when the store has already dropped it.
#[derive(Clone)]
pub enum Requester {
    SportEvent(Arc<SportEventCacheItem>),
    Competitor(Arc<CompetitorCacheItem>),
    Player(Arc<PlayerCacheItem>),
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SportEvent(item) => f.debug_tuple("SportEvent").field(&item.id().to_string()).finish(),
            Self::Competitor(item) => f.debug_tuple("Competitor").field(&item.id().to_string()).finish(),
            Self::Player(item) => f.debug_tuple("Player").field(&item.id().to_string()).finish(),
        }
    }
}

/// One payload travelling through the manager
#[derive(Debug, Clone)]
pub struct DtoEnvelope {
    /// Id of the entity the payload was fetched for (or a list name)
    pub id: String,
    pub payload: DtoPayload,
    pub language: Language,
    pub requester: Option<Requester>,
}

impl DtoEnvelope {
    pub fn new(id: impl Into<String>, payload: DtoPayload, language: Language) -> Self {
        Self { id: id.into(), payload, language, requester: None }
    }

    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn dto_type(&self) -> DtoType {
        self.payload.dto_type()
    }
}
