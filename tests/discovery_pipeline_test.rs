#[path = "utils/mod.rs"]
mod utils;

use std::time::Duration;

use tricrawl::modules::discovery::{DiscoveryConfig, DiscoveryService};
use tricrawl::modules::mal::MalClient;
use tricrawl::modules::mapping::MappingUpsert;

fn config() -> DiscoveryConfig {
    DiscoveryConfig {
        phash_threshold: 5,
        title_similarity_threshold: 0.85,
        episode_tolerance: 2,
    }
}

#[tokio::test]
async fn resolve_by_slug_is_cached_when_the_mapping_already_exists() {
    let test_db = utils::test_db::TestDb::new();
    let mapping_repo = utils::factories::mapping_repo(test_db.pool());
    mapping_repo
        .upsert(MappingUpsert::new(55).with_slug("animasu", "already-known"))
        .await
        .expect("seed mapping");

    let mal = std::sync::Arc::new(MalClient::new(Duration::from_millis(1)));
    let discovery = DiscoveryService::new(mapping_repo, mal, config());

    let (mapping, cached) = discovery
        .resolve_by_slug("animasu", "already-known")
        .await
        .expect("resolve");
    assert!(cached, "a mapping already in the store must report cached=true");
    assert_eq!(mapping.mal_id, 55);
}

#[tokio::test]
async fn resolve_by_slug_rejects_an_unknown_provider() {
    let test_db = utils::test_db::TestDb::new();
    let mapping_repo = utils::factories::mapping_repo(test_db.pool());
    let mal = std::sync::Arc::new(MalClient::new(Duration::from_millis(1)));
    let discovery = DiscoveryService::new(mapping_repo, mal, config());

    let result = discovery.resolve_by_slug("not-a-real-provider", "whatever").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn resolve_by_mal_id_is_cached_when_the_mapping_already_exists() {
    let test_db = utils::test_db::TestDb::new();
    let mapping_repo = utils::factories::mapping_repo(test_db.pool());
    mapping_repo
        .upsert(utils::factories::sample_upsert(9001, "Cached Show"))
        .await
        .expect("seed mapping");

    let mal = std::sync::Arc::new(MalClient::new(Duration::from_millis(1)));
    let discovery = DiscoveryService::new(mapping_repo, mal, config());

    let (mapping, cached) = discovery.resolve_by_mal_id(9001).await.expect("resolve");
    assert!(cached);
    assert_eq!(mapping.title_main, "Cached Show");
}
