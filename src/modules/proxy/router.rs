use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::modules::proxy::handlers::{health, proxy};
use crate::modules::proxy::types::ProxyState;

pub fn build_router(state: Arc<ProxyState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::HEAD, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::RANGE])
        .expose_headers([
            axum::http::header::CONTENT_LENGTH,
            axum::http::header::CONTENT_RANGE,
            axum::http::header::ACCEPT_RANGES,
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/proxy", get(proxy))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
