#[path = "utils/mod.rs"]
mod utils;

use tricrawl::modules::mapping::MappingUpsert;

#[tokio::test]
async fn upsert_coalesces_fields_instead_of_clobbering() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::mapping_repo(test_db.pool());

    let first = repo
        .upsert(MappingUpsert {
            title_main: Some("Bocchi the Rock".to_string()),
            release_year: Some(2022),
            ..MappingUpsert::new(12345)
        })
        .await
        .expect("first upsert");
    assert_eq!(first.title_main, "Bocchi the Rock");
    assert_eq!(first.release_year, Some(2022));
    assert!(first.slug_animasu.is_none());

    // A second, partial upsert only supplies a provider slug. The title and
    // release year must survive untouched (§4.4 field-wise coalesce).
    let second = repo
        .upsert(MappingUpsert::new(12345).with_slug("animasu", "bocchi-the-rock"))
        .await
        .expect("second upsert");
    assert_eq!(second.title_main, "Bocchi the Rock");
    assert_eq!(second.release_year, Some(2022));
    assert_eq!(second.slug_animasu.as_deref(), Some("bocchi-the-rock"));
}

#[tokio::test]
async fn find_by_slug_is_case_insensitive_on_provider() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::mapping_repo(test_db.pool());

    repo.upsert(MappingUpsert::new(777).with_slug("otakudesu", "my-title"))
        .await
        .expect("upsert");

    let found = repo
        .find_by_slug("OtakuDesu", "my-title")
        .await
        .expect("query")
        .expect("mapping should exist");
    assert_eq!(found.mal_id, 777);

    let missing = repo
        .find_by_slug("otakudesu", "no-such-slug")
        .await
        .expect("query");
    assert!(missing.is_none());
}

#[tokio::test]
async fn list_recent_reflects_most_recently_synced_mappings() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::mapping_repo(test_db.pool());

    for (mal_id, title) in [(1, "Alpha"), (2, "Beta"), (3, "Gamma")] {
        repo.upsert(utils::factories::sample_upsert(mal_id, title))
            .await
            .expect("upsert");
    }

    let rows = repo.list_recent(2).await.expect("list_recent");
    assert_eq!(rows.len(), 2);
}
