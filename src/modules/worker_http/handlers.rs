use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::modules::api::into_response;
use crate::modules::archival::ArchivalWorker;
use crate::shared::errors::AppError;

pub async fn health() -> impl IntoResponse {
    Json(json!({"success": true, "service": "tricrawl-worker", "status": "ok"}))
}

pub async fn status(State(worker): State<Arc<ArchivalWorker>>) -> Response {
    match worker.status_counts().await {
        Ok(counts) => Json(json!({"success": true, "data": counts})).into_response(),
        Err(e) => into_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerBody {
    pub mal_id: i32,
    pub episode: i32,
    pub provider: String,
    #[allow(dead_code)]
    pub video_url: String,
    pub resolution: Option<String>,
}

/// `POST /trigger` (§6): bearer-authenticated nudge from the API process
/// to run a freshly enqueued job immediately instead of waiting for the
/// next poll tick.
pub async fn trigger(
    State(worker): State<Arc<ArchivalWorker>>,
    headers: HeaderMap,
    Json(body): Json<TriggerBody>,
) -> Response {
    let expected = format!("Bearer {}", worker.salt());
    let ok = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        return into_response(AppError::Unauthorized("invalid bearer token".to_string()));
    }

    worker
        .trigger(body.mal_id, body.episode, &body.provider, body.resolution.as_deref())
        .await;

    (StatusCode::ACCEPTED, Json(json!({"success": true}))).into_response()
}
