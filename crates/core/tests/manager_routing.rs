//! Integration tests for payload routing, invalidation and cache isolation
//! in the cache manager.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oddsfeed_core::{
    CacheHealth, CacheManager, DtoEnvelope, ExportableItem, SpecializedCache,
};
use oddsfeed_domain::dto::{EventStatus, SportEventStatusDto};
use oddsfeed_domain::{CacheError, CacheItemType, DtoPayload, DtoType, Result};
use support::{lang, match_summary, urn, with_status, Harness, MockDataRouter};

#[derive(Clone, Copy)]
enum Behaviour {
    Merge,
    Fail,
    Panic,
}

/// Minimal cache that counts deliveries and reacts per `Behaviour`
struct StubCache {
    name: &'static str,
    accepted: &'static [DtoType],
    behaviour: Behaviour,
    deliveries: AtomicUsize,
}

impl StubCache {
    fn new(name: &'static str, accepted: &'static [DtoType], behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self { name, accepted, behaviour, deliveries: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl SpecializedCache for StubCache {
    fn name(&self) -> &str {
        self.name
    }

    fn accepted_dto_types(&self) -> &[DtoType] {
        self.accepted
    }

    fn item_types(&self) -> &[CacheItemType] {
        &[CacheItemType::SportEvent]
    }

    async fn add_dto(&self, _envelope: &DtoEnvelope) -> Result<bool> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Merge => Ok(true),
            Behaviour::Fail => Err(CacheError::Config("stub failure".to_string())),
            Behaviour::Panic => panic!("stub cache exploded"),
        }
    }

    fn delete_item(&self, _id: &str, _item_type: CacheItemType) -> bool {
        false
    }

    fn has_item(&self, _id: &str, _item_type: CacheItemType) -> bool {
        false
    }

    fn health(&self) -> CacheHealth {
        CacheHealth::new(self.name, true, 0)
    }

    async fn export(&self) -> Vec<ExportableItem> {
        Vec::new()
    }

    async fn import(&self, _items: &[ExportableItem]) -> Result<usize> {
        Ok(0)
    }

    async fn delete_all(&self) {}

    fn clean_locks(&self) -> usize {
        0
    }

    fn dispose(&self) {}
}

const SUMMARIES: &[DtoType] = &[DtoType::MatchSummary];

fn live() -> SportEventStatusDto {
    SportEventStatusDto {
        status: EventStatus::Live,
        home_score: Some(1),
        away_score: Some(0),
        ..Default::default()
    }
}

/// Validates type routing of a match summary.
///
/// Assertions:
/// - Confirms the event, status and profile caches receive the summary.
/// - Confirms the sport data and market caches do not.
#[tokio::test]
async fn test_summary_routed_to_interested_caches() {
    let harness = Harness::new(MockDataRouter::new());
    let summary = with_status(match_summary("Team A vs Team B", "Team A", "Team B"), live());

    let report = harness
        .manager
        .save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None)
        .await;

    assert_eq!(report.merged, vec!["ProfileCache", "SportEventCache", "SportEventStatusCache"]);
    assert!(!report.has_failures());
    assert!(harness.events.peek(&urn("sr:match:123")).is_some());
    assert_eq!(harness.statuses.get_status(&urn("sr:match:123")).unwrap().status.status, EventStatus::Live);
    assert!(harness.profiles.peek_competitor(&urn("sr:competitor:2")).is_some());
    assert!(!harness.manager.has_item("sr:category:1", CacheItemType::Category));
    assert_eq!(harness.router.total_calls(), 0);
}

#[tokio::test]
async fn test_status_payload_replaces_status() {
    let harness = Harness::new(MockDataRouter::new());
    harness
        .manager
        .save_dto("sr:match:123", DtoPayload::SportEventStatus(live()), lang("en"), None)
        .await;

    let mut ended = live();
    ended.status = EventStatus::Ended;
    let report = harness
        .manager
        .save_dto("sr:match:123", DtoPayload::SportEventStatus(ended), lang("en"), None)
        .await;

    assert_eq!(report.merged, vec!["SportEventStatusCache"]);
    let cached = harness.statuses.get_status(&urn("sr:match:123")).unwrap();
    assert_eq!(cached.status.status, EventStatus::Ended);
}

/// Validates attributed invalidation.
///
/// Assertions:
/// - Confirms the originator keeps its item.
/// - Confirms every other cache owning the kind drops it.
#[tokio::test]
async fn test_invalidation_skips_originator() {
    let harness = Harness::new(MockDataRouter::new());
    let summary = with_status(match_summary("Team A vs Team B", "Team A", "Team B"), live());
    harness
        .manager
        .save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None)
        .await;

    let removed = harness.manager.invalidate("sr:match:123", CacheItemType::SportEvent, Some("ProfileCache"));
    assert_eq!(removed, vec!["SportEventCache", "SportEventStatusCache"]);
    assert!(!harness.manager.has_item("sr:match:123", CacheItemType::SportEvent));

    let removed = harness.manager.remove_cache_item(
        "sr:competitor:1",
        CacheItemType::Competitor,
        Some("SportEventCache"),
    );
    assert_eq!(removed, vec!["ProfileCache"]);
}

#[tokio::test]
async fn test_invalidation_by_originator_keeps_own_copy() {
    let harness = Harness::new(MockDataRouter::new());
    let summary = with_status(match_summary("x", "A", "B"), live());
    harness
        .manager
        .save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None)
        .await;

    let removed = harness.manager.invalidate("sr:match:123", CacheItemType::All, Some("SportEventCache"));

    assert_eq!(removed, vec!["SportEventStatusCache"]);
    assert!(harness.events.peek(&urn("sr:match:123")).is_some());
}

/// Validates cache isolation during dispatch.
///
/// Assertions:
/// - Confirms a failing cache and a panicking cache are reported as failed.
/// - Confirms the healthy cache still receives the payload.
#[tokio::test]
async fn test_failing_cache_does_not_affect_others() {
    let manager = CacheManager::new();
    let healthy = StubCache::new("Healthy", SUMMARIES, Behaviour::Merge);
    let failing = StubCache::new("Failing", SUMMARIES, Behaviour::Fail);
    let panicking = StubCache::new("Panicking", SUMMARIES, Behaviour::Panic);
    manager.register(healthy.clone()).unwrap();
    manager.register(failing.clone()).unwrap();
    manager.register(panicking.clone()).unwrap();

    let summary = match_summary("Team A vs Team B", "Team A", "Team B");
    let report = manager.save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None).await;

    assert_eq!(report.merged, vec!["Healthy"]);
    assert_eq!(report.failed, vec!["Failing", "Panicking"]);
    assert_eq!(report.delivered(), 3);
    assert_eq!(healthy.deliveries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unaccepted_payload_reaches_nobody() {
    let manager = CacheManager::new();
    let stub = StubCache::new("Summaries", SUMMARIES, Behaviour::Merge);
    manager.register(stub.clone()).unwrap();

    let report =
        manager.save_dto("sr:match:1", DtoPayload::SportEventStatus(live()), lang("en"), None).await;

    assert_eq!(report.delivered(), 0);
    assert_eq!(stub.deliveries.load(Ordering::SeqCst), 0);
}

#[test]
fn test_registration_errors() {
    let manager = CacheManager::new();
    manager.register(StubCache::new("A", SUMMARIES, Behaviour::Merge)).unwrap();

    let duplicate = manager.register(StubCache::new("A", SUMMARIES, Behaviour::Merge));
    assert!(matches!(duplicate, Err(CacheError::Registration(_))));

    let empty = manager.register(StubCache::new("B", &[], Behaviour::Merge));
    assert!(matches!(empty, Err(CacheError::Registration(_))));

    assert_eq!(manager.registered_caches(), vec!["A"]);
}

#[tokio::test]
async fn test_disposed_manager_drops_payloads() {
    let harness = Harness::new(MockDataRouter::new());
    harness.manager.dispose();

    let summary = match_summary("x", "A", "B");
    let report = harness
        .manager
        .save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None)
        .await;

    assert!(harness.manager.is_disposed());
    assert_eq!(report.delivered(), 0);
}

#[tokio::test]
async fn test_health_aggregates_caches() {
    let harness = Harness::new(MockDataRouter::new());
    let summary = match_summary("Team A vs Team B", "Team A", "Team B");
    harness
        .manager
        .save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None)
        .await;

    let health = harness.manager.health();
    assert!(health.healthy);
    assert_eq!(health.caches.len(), 7);
    let events = health.caches.iter().find(|cache| cache.name == "SportEventCache").unwrap();
    assert_eq!(events.item_count, 2);
    assert_eq!(events.details["in_flight"], "0");
}

#[tokio::test]
async fn test_delete_all_empties_every_cache() {
    let harness = Harness::new(MockDataRouter::new());
    let summary = with_status(match_summary("x", "A", "B"), live());
    harness
        .manager
        .save_dto("sr:match:123", DtoPayload::MatchSummary(summary), lang("en"), None)
        .await;

    harness.manager.delete_all().await;

    assert!(!harness.manager.has_item("sr:match:123", CacheItemType::All));
    assert!(!harness.manager.has_item("sr:competitor:1", CacheItemType::Competitor));
    assert_eq!(harness.manager.health().item_count, 0);
}
