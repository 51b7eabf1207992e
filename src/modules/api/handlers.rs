use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::modules::api::error::ApiError;
use crate::modules::api::genres;
use crate::modules::api::state::ApiState;
use crate::modules::mapping::{ListingRow, Mapping, PROVIDERS};
use crate::modules::streaming::{self, EpisodeEntry, Site};
use crate::shared::errors::AppError;
use crate::shared::utils::Validator;

const PAGE_SIZE: i64 = 10;
const HOME_LIMIT: i64 = 20;

pub async fn health() -> impl IntoResponse {
    Json(json!({"success": true, "service": "anime-aggregator-api", "status": "ok"}))
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "service": "anime-aggregator-api",
        "routes": [
            "/api/v1/home",
            "/api/v1/search",
            "/api/v1/anime/:slug",
            "/api/v1/anime/mal/:malId",
            "/api/v1/streaming/:malId/:episode",
        ],
    }))
}

pub async fn home(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let started = Instant::now();
    let rows = state.mapping_repo.list_recent(HOME_LIMIT).await?;
    let data: Vec<Value> = rows.iter().map(listing_row_to_card).collect();

    let elapsed = started.elapsed().as_secs_f64();
    let mut response = Json(json!({
        "success": true,
        "count": data.len(),
        "duration": elapsed,
        "data": data,
    }))
    .into_response();

    if let Ok(header) = HeaderValue::from_str(&format!("{:.3}", elapsed)) {
        response.headers_mut().insert("X-Response-Time", header);
    }

    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub genre: String,
    pub page: Option<i64>,
}

pub async fn search(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    Validator::validate_genre(&query.genre).map_err(ApiError::from)?;
    let (genre_id, genre_name) = genres::resolve(&query.genre)
        .ok_or_else(|| AppError::ValidationError(format!("unknown genre: {}", query.genre)))
        .map_err(ApiError::from)?;

    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * PAGE_SIZE;

    let mut rows = state
        .mapping_repo
        .search_by_genre(genre_name, offset, PAGE_SIZE + 1)
        .await?;
    let has_next_page = rows.len() as i64 > PAGE_SIZE;
    rows.truncate(PAGE_SIZE as usize);

    let data: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "mal_id": row.mal_id,
                "name": row.title_main,
                "cover": row.cover,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "genre_id": genre_id,
        "page": page,
        "has_next_page": has_next_page,
        "count": data.len(),
        "data": data,
    })))
}

#[derive(Debug, Deserialize, Default)]
pub struct AnimeQuery {
    pub provider: Option<String>,
}

pub async fn anime_by_slug(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
    Query(query): Query<AnimeQuery>,
) -> Result<Json<Value>, ApiError> {
    let provider = query
        .provider
        .ok_or_else(|| AppError::ValidationError("provider query parameter is required".to_string()))
        .map_err(ApiError::from)?;
    Validator::validate_provider(&provider, PROVIDERS).map_err(ApiError::from)?;
    Validator::validate_slug(&slug).map_err(ApiError::from)?;

    let (mapping, cached) = state.discovery.resolve_by_slug(&provider, &slug).await?;
    let mal = resolve_mal_metadata(&state, mapping.mal_id).await;
    let episodes = episodes_for(&mapping, Some(provider.as_str())).await;

    Ok(Json(json!({
        "success": true,
        "cached": cached,
        "data": {
            "mapping": mapping,
            "mal": mal,
            "episodes": episodes,
        },
    })))
}

pub async fn anime_by_mal_id(
    State(state): State<Arc<ApiState>>,
    Path(mal_id): Path<i32>,
    Query(query): Query<AnimeQuery>,
) -> Result<Json<Value>, ApiError> {
    Validator::validate_mal_id(mal_id).map_err(ApiError::from)?;

    let (mapping, cached) = state.discovery.resolve_by_mal_id(mal_id).await?;
    let mal = resolve_mal_metadata(&state, mapping.mal_id).await;
    let episodes = episodes_for(&mapping, query.provider.as_deref()).await;

    Ok(Json(json!({
        "success": true,
        "cached": cached,
        "data": {
            "mapping": mapping,
            "mal": mal,
            "episodes": episodes,
        },
    })))
}

pub async fn streaming(
    State(state): State<Arc<ApiState>>,
    Path((mal_id, episode)): Path<(i32, i32)>,
) -> Result<Json<Value>, ApiError> {
    Validator::validate_mal_id(mal_id).map_err(ApiError::from)?;
    Validator::validate_episode(episode).map_err(ApiError::from)?;

    let mapping = state
        .mapping_repo
        .find_by_mal_id(mal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no mapping cached for mal_id {}", mal_id)))
        .map_err(ApiError::from)?;

    let per_provider = state.streaming.get_streaming(&mapping, episode).await;

    let data: HashMap<String, Vec<Value>> = per_provider
        .into_iter()
        .map(|(provider, servers)| {
            let entries = servers
                .into_iter()
                .map(|s| {
                    json!({
                        "provider": s.provider,
                        "url": s.embed_url,
                        "url_resolved": s.resolved_url,
                        "resolution": s.resolution,
                        "stream": s.stream_url,
                    })
                })
                .collect();
            (provider, entries)
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "mal_id": mal_id,
        "episode": episode,
        "data": data,
    })))
}

#[derive(Debug, Deserialize)]
pub struct InvalidateBody {
    pub mal_id: i32,
    pub episode: i32,
    pub secret: String,
}

pub async fn invalidate_streaming(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<InvalidateBody>,
) -> Result<Json<Value>, ApiError> {
    if body.secret != state.archival_salt {
        return Err(ApiError::from(AppError::Unauthorized("invalid secret".to_string())));
    }

    state.streaming.invalidate(body.mal_id, body.episode);

    Ok(Json(json!({"success": true})))
}

pub async fn not_found() -> Response {
    ApiError::from(AppError::NotFound("route not found".to_string())).into_response()
}

fn listing_row_to_card(row: &ListingRow) -> Value {
    let mut provider_slugs = serde_json::Map::new();
    let mut slugs = Vec::new();
    let mut sources = Vec::new();

    for (provider, slug) in [
        ("animasu", &row.slug_animasu),
        ("samehadaku", &row.slug_samehadaku),
        ("otakudesu", &row.slug_otakudesu),
    ] {
        if let Some(slug) = slug {
            provider_slugs.insert(provider.to_string(), json!(slug));
            slugs.push(slug.clone());
            sources.push(provider.to_string());
        }
    }

    json!({
        "name": row.title_main,
        "cover": row.cover,
        "provider": sources.first(),
        "sources": sources,
        "slugs": slugs,
        "providerSlugs": provider_slugs,
    })
}

async fn resolve_mal_metadata(state: &ApiState, mal_id: i32) -> Option<Value> {
    if let Ok(Some(row)) = state.mapping_repo.get_mal_metadata(mal_id).await {
        return Some(serde_json::to_value(row).unwrap_or(Value::Null));
    }

    let full = state.mal.get_full_by_id(mal_id).await?;
    let row = crate::modules::discovery::mal_metadata_from_full(&full);
    let _ = state.mapping_repo.upsert_mal_metadata(row.clone()).await;
    Some(serde_json::to_value(row).unwrap_or(Value::Null))
}

async fn episodes_for(mapping: &Mapping, only_provider: Option<&str>) -> HashMap<String, Option<Vec<EpisodeEntry>>> {
    let wanted: Vec<&str> = match only_provider {
        Some(p) => vec![p],
        None => PROVIDERS.to_vec(),
    };

    let fetches = wanted.into_iter().map(|provider| {
        let slug = mapping.slug_for(provider).map(str::to_string);
        let site = Site::by_name(provider);
        async move {
            match (site, slug) {
                (Some(site), Some(slug)) => {
                    let list = streaming::episode_list(site, &slug).await;
                    (provider.to_string(), Some(list))
                }
                _ => (provider.to_string(), None),
            }
        }
    });

    join_all(fetches).await.into_iter().collect()
}
