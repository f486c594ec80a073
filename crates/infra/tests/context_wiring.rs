//! Integration tests for `CacheContext`
//!
//! Builds the full cache layer against a canned router and checks wiring,
//! background refresh and shutdown.

mod support;

use std::sync::Arc;
use std::time::Duration;

use oddsfeed_core::items::SportEventAttribute;
use oddsfeed_domain::{CacheError, CacheItemType};
use oddsfeed_infra::{CacheContext, InfraError, SchedulerError};
use support::{lang, test_settings, urn, CannedRouter};

#[test]
fn test_context_registers_every_cache() {
    let context = CacheContext::new(test_settings(), Arc::new(CannedRouter::new())).unwrap();

    assert_eq!(
        context.manager.registered_caches(),
        vec![
            "SportEventCache",
            "SportEventStatusCache",
            "ProfileCache",
            "SportDataCache",
            "InvariantMarketCache",
            "VariantMarketCache",
            "VariantDescriptionCache",
        ]
    );
    assert_eq!(context.manager.health().caches.len(), 7);
}

#[test]
fn test_invalid_settings_rejected() {
    let mut settings = test_settings();
    settings.languages.wanted.clear();

    let result = CacheContext::new(settings, Arc::new(CannedRouter::new()));

    assert!(matches!(result, Err(InfraError::Cache(CacheError::Config(_)))));

    let mut settings = test_settings();
    settings.locking.clean_interval = Duration::ZERO;
    let result = CacheContext::new(settings, Arc::new(CannedRouter::new()));
    assert!(matches!(result, Err(InfraError::Cache(CacheError::Config(_)))));
}

/// Validates that a fetched summary reaches every interested cache.
///
/// Assertions:
/// - Confirms one summary call per language.
/// - Confirms the competitors from the summary land in the profile cache.
#[tokio::test]
async fn test_summary_fans_out_through_context() {
    let router = Arc::new(CannedRouter::new());
    let context = CacheContext::new(test_settings(), router.clone()).unwrap();
    let languages = [lang("en"), lang("de")];

    let names = context
        .events
        .get_translated_value(&urn("sr:match:1"), SportEventAttribute::Name, &languages, true)
        .await
        .unwrap();

    assert_eq!(names[&lang("en")], "sr:match:1 [en]");
    assert_eq!(names[&lang("de")], "sr:match:1 [de]");
    assert_eq!(router.calls("summary"), 2);
    assert!(context.profiles.peek_competitor(&urn("sr:competitor:1")).is_some());
    assert!(context.manager.has_item("sr:competitor:2", CacheItemType::Competitor));
}

#[tokio::test]
async fn test_refresh_disabled_is_noop() {
    let mut context = CacheContext::new(test_settings(), Arc::new(CannedRouter::new())).unwrap();

    assert!(!context.start_refresh().await.unwrap());
    assert!(!context.is_refreshing());
}

/// Validates the background refresh lifecycle.
///
/// Assertions:
/// - Confirms reference lists are fetched in every language while running.
/// - Confirms a second start is rejected.
/// - Confirms shutdown stops the scheduler and disposes the manager.
#[tokio::test(flavor = "multi_thread")]
async fn test_background_refresh_and_shutdown() {
    let router = Arc::new(CannedRouter::new());
    let mut settings = test_settings();
    settings.refresh.enabled = true;
    settings.refresh.interval = Duration::from_millis(20);
    let mut context = CacheContext::new(settings, router.clone()).unwrap();

    assert!(context.start_refresh().await.unwrap());
    assert!(context.is_refreshing());
    assert!(matches!(
        context.start_refresh().await,
        Err(InfraError::Scheduler(SchedulerError::AlreadyRunning))
    ));

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(router.calls("sports") >= 2);
    assert!(router.calls("markets") >= 2);
    assert!(router.calls("variants") >= 2);
    assert!(context.manager.has_item("1", CacheItemType::MarketDescription));

    context.shutdown().await;
    assert!(!context.is_refreshing());
    assert!(context.manager.is_disposed());
}

#[tokio::test]
async fn test_refresh_jobs_cover_reference_lists() {
    let context = CacheContext::new(test_settings(), Arc::new(CannedRouter::new())).unwrap();

    let names: Vec<String> =
        context.refresh_jobs().iter().map(|job| job.name().to_string()).collect();

    assert_eq!(names, vec!["SportDataCache", "InvariantMarketCache", "VariantDescriptionCache"]);
}
