use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::modules::api::handlers;
use crate::modules::api::state::ApiState;

pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root))
        .route("/api/v1/home", get(handlers::home))
        .route("/api/v1/search", get(handlers::search))
        .route("/api/v1/anime/mal/:mal_id", get(handlers::anime_by_mal_id))
        .route("/api/v1/anime/:slug", get(handlers::anime_by_slug))
        .route("/api/v1/streaming/:mal_id/:episode", get(handlers::streaming))
        .route("/api/v1/streaming/invalidate", post(handlers::invalidate_streaming))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
