use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tricrawl::modules::proxy::{build_router, ProxyState};

fn router() -> axum::Router {
    let state = std::sync::Arc::new(ProxyState::new("http://127.0.0.1:8082".to_string(), &[]));
    build_router(state)
}

#[tokio::test]
async fn missing_url_param_is_rejected() {
    let response = router()
        .oneshot(Request::builder().uri("/proxy").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_absolute_url_is_rejected() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/proxy?url=not-a-url")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forwards_range_and_forces_video_content_type() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ep1.mp4"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "bytes 0-99/100")
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(vec![0u8; 100]),
        )
        .mount(&upstream)
        .await;

    let target = format!("{}/ep1.mp4", upstream.uri());
    let uri = format!("/proxy?url={}", urlencoding::encode(&target));

    let response = router()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("range", "bytes=0-99")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "video/mp4"
    );
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert!(response.headers().get("content-disposition").is_none() ||
        response.headers().get("content-disposition").unwrap() == "inline");
}
