use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::modules::archival::ArchivalWorker;
use crate::modules::worker_http::handlers;

pub fn build_router(worker: Arc<ArchivalWorker>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/trigger", post(handlers::trigger))
        .layer(TraceLayer::new_for_http())
        .with_state(worker)
}
