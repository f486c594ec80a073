//! Export and import of cache snapshots between manager instances.

mod support;

use oddsfeed_core::items::SportEventAttribute;
use oddsfeed_core::ExportableItem;
use oddsfeed_domain::dto::{
    CategoryDto, MarketDescriptionDto, MarketDescriptionListDto, SportDto, SportEntryDto,
    SportListDto, VariantDescriptionDto, VariantDescriptionListDto,
};
use support::{kind, lang, langs, match_summary, team_profile, urn, Harness, MockDataRouter};

fn populated_router() -> MockDataRouter {
    MockDataRouter::new()
        .with_summary("en", match_summary("Team A vs Team B", "Team A", "Team B"))
        .with_summary("de", match_summary("Team A gegen Team B", "Team A", "Team B"))
        .with_competitor("en", team_profile("Team A", "John Smith"))
        .with_sports(
            "en",
            SportListDto {
                sports: vec![SportEntryDto {
                    sport: SportDto::new(urn("sr:sport:1"), "Soccer"),
                    categories: vec![CategoryDto::new(urn("sr:category:1"), urn("sr:sport:1"), "England")],
                }],
            },
        )
}

async fn populate(harness: &Harness) {
    harness
        .events
        .get_translated_value(&urn("sr:match:123"), SportEventAttribute::Name, &langs(&["en", "de"]), true)
        .await
        .unwrap();
    harness.profiles.get_competitor(&urn("sr:competitor:1"), &langs(&["en"])).await.unwrap();
    harness.sport_data.get_sports(&langs(&["en"])).await.unwrap();
}

/// Validates a full export, JSON transport and import into a fresh manager.
///
/// Assertions:
/// - Confirms every exported item is imported.
/// - Confirms imported items answer lookups without any fetch.
#[tokio::test]
async fn test_snapshot_round_trip_through_json() {
    let source = Harness::new(populated_router());
    populate(&source).await;

    let exported = source.manager.export().await;
    let json = serde_json::to_string(&exported).unwrap();
    let restored: Vec<ExportableItem> = serde_json::from_str(&json).unwrap();

    let target = Harness::new(MockDataRouter::new());
    let imported = target.manager.import(&restored).await.unwrap();
    assert_eq!(imported, exported.len());

    let names = target
        .events
        .get_translated_value(&urn("sr:match:123"), SportEventAttribute::Name, &langs(&["en", "de"]), true)
        .await
        .unwrap();
    assert_eq!(names[&lang("de")], "Team A gegen Team B");

    let team = target.profiles.get_competitor(&urn("sr:competitor:1"), &langs(&["en"])).await.unwrap();
    assert_eq!(team.player_ids(), vec![urn("sr:player:10")]);
    let player = target.profiles.get_player(&urn("sr:player:10"), &langs(&["en"]), None).await.unwrap();
    assert_eq!(player.name(&lang("en")).as_deref(), Some("John Smith"));

    assert_eq!(target.router.calls_of_kind(kind::SUMMARY), 0);
    assert_eq!(target.router.calls_of_kind(kind::COMPETITOR), 0);
    assert_eq!(target.router.calls_of_kind(kind::PLAYER), 0);
}

#[tokio::test]
async fn test_export_contains_each_kind_once() {
    let harness = Harness::new(populated_router());
    populate(&harness).await;

    let exported = harness.manager.export().await;
    let mut keys: Vec<String> = exported.iter().map(ExportableItem::key).collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();

    assert_eq!(keys.len(), total);
    for expected in ["sr:match:123", "sr:tournament:17", "sr:competitor:1", "sr:player:10", "sr:sport:1", "sr:category:1"] {
        assert!(keys.iter().any(|key| key == expected), "missing {expected}");
    }
}

#[tokio::test]
async fn test_import_skips_foreign_kinds_per_cache() {
    let source = Harness::new(populated_router());
    populate(&source).await;
    let events_only: Vec<ExportableItem> = source
        .manager
        .export()
        .await
        .into_iter()
        .filter(|item| matches!(item, ExportableItem::SportEvent { .. }))
        .collect();

    let target = Harness::new(MockDataRouter::new());
    let imported = target.manager.import(&events_only).await.unwrap();

    assert_eq!(imported, 2);
    assert_eq!(target.events.count(), 2);
    assert!(target.profiles.peek_competitor(&urn("sr:competitor:1")).is_none());
}

/// Validates that reference lists survive a warm restart.
///
/// Assertions:
/// - Confirms list-level loaded languages travel with the snapshot.
/// - Confirms sports, markets and variants answer without any list fetch.
#[tokio::test]
async fn test_reference_lists_round_trip_without_refetch() {
    let router = populated_router()
        .with_markets("en", MarketDescriptionListDto { markets: vec![MarketDescriptionDto::new(1, "1x2")] })
        .with_variants(
            "en",
            VariantDescriptionListDto {
                variants: vec![VariantDescriptionDto { id: "sr:exact_goals:5+".to_string(), outcomes: Vec::new() }],
            },
        );
    let source = Harness::new(router);
    let en = langs(&["en"]);
    source.sport_data.get_sports(&en).await.unwrap();
    source.markets.get_market(1, &en).await.unwrap();
    source.variants.get_variant_description("sr:exact_goals:5+", &en).await.unwrap();

    let exported = source.manager.export().await;
    assert!(exported.iter().any(|item| matches!(
        item,
        ExportableItem::LoadedLanguages { cache, languages } if cache == "SportDataCache" && languages == &en
    )));

    let target = Harness::new(MockDataRouter::new());
    let imported = target.manager.import(&exported).await.unwrap();
    assert_eq!(imported, exported.len());

    let sports = target.sport_data.get_sports(&en).await.unwrap();
    let market = target.markets.get_market(1, &en).await.unwrap();
    let variant = target.variants.get_variant_description("sr:exact_goals:5+", &en).await.unwrap();

    assert_eq!(sports.len(), 1);
    assert!(market.is_some());
    assert!(variant.is_some());
    assert_eq!(target.router.calls_of_kind(kind::SPORTS), 0);
    assert_eq!(target.router.calls_of_kind(kind::MARKETS), 0);
    assert_eq!(target.router.calls_of_kind(kind::VARIANTS), 0);
}
