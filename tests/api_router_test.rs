#[path = "utils/mod.rs"]
mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use tricrawl::modules::api::{build_router, ApiState};
use tricrawl::modules::archival::ArchivalRepository;
use tricrawl::modules::discovery::{DiscoveryConfig, DiscoveryService};
use tricrawl::modules::mal::MalClient;
use tricrawl::modules::streaming::StreamingService;
use tricrawl::shared::database::Database;

fn build_state(pool: utils::test_db::TestPool) -> Arc<ApiState> {
    let db = Arc::new(Database::from_pool(pool));
    let mapping_repo = Arc::new(tricrawl::modules::mapping::MappingRepository::new(Arc::clone(&db)));
    let archival_repo = Arc::new(ArchivalRepository::new(Arc::clone(&db)));
    let mal = Arc::new(MalClient::new(Duration::from_millis(1)));
    let discovery = Arc::new(DiscoveryService::new(
        Arc::clone(&mapping_repo),
        Arc::clone(&mal),
        DiscoveryConfig {
            phash_threshold: 5,
            title_similarity_threshold: 0.85,
            episode_tolerance: 2,
        },
    ));
    let streaming = Arc::new(StreamingService::new(
        Duration::from_secs(1200),
        archival_repo,
        "http://127.0.0.1:8081".to_string(),
        "http://127.0.0.1:8082".to_string(),
        "test-salt".to_string(),
    ));

    Arc::new(ApiState {
        mapping_repo,
        mal,
        discovery,
        streaming,
        archival_salt: "test-salt".to_string(),
    })
}

#[tokio::test]
async fn health_is_always_ok() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_returns_404_with_error_shape() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let response = router
        .oneshot(Request::builder().uri("/not-a-route").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_rejects_an_unknown_genre() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?genre=not-a-real-genre")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anime_by_mal_id_rejects_a_non_positive_id_before_touching_the_store() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/anime/mal/-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn streaming_rejects_a_non_positive_episode() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/streaming/123/0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalidate_requires_the_correct_shared_secret() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let body = serde_json::json!({"mal_id": 1, "episode": 1, "secret": "wrong"}).to_string();
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/streaming/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn home_returns_an_empty_listing_on_a_fresh_store() {
    let test_db = utils::test_db::TestDb::new();
    let router = build_router(build_state(test_db.pool()));

    let response = router
        .oneshot(Request::builder().uri("/api/v1/home").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-response-time"));
}
