use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::log_warn;
use crate::modules::proxy::m3u8::{looks_like_hls, rewrite_playlist};
use crate::modules::proxy::types::{ProxyQuery, ProxyState};
use crate::modules::resolvers::BROWSER_UA;
use crate::shared::utils::Validator;

pub async fn health() -> impl IntoResponse {
    Json(json!({"success": true, "service": "stream-proxy", "status": "ok"}))
}

pub async fn proxy(
    State(state): State<Arc<ProxyState>>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Response {
    let target = match Validator::validate_absolute_url(&query.url) {
        Ok(url) => url,
        Err(e) => return bad_request(&e.to_string()),
    };

    let resolved = match resolve_target(&state, target.as_str()).await {
        Ok(url) => url,
        Err(e) => {
            log_warn!("proxy: failed to resolve target {}: {}", target, e);
            return bad_gateway();
        }
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut req = state.http.get(&resolved).header(header::USER_AGENT, BROWSER_UA);
    if let Some(range) = &range {
        req = req.header(header::RANGE, range.clone());
    }

    let upstream = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            log_warn!("proxy: upstream request failed for {}: {}", resolved, e);
            return bad_gateway();
        }
    };

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = upstream
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_range = upstream
        .headers()
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if looks_like_hls(resolved.as_str(), content_type.as_deref()) {
        let text = match upstream.text().await {
            Ok(t) => t,
            Err(e) => {
                log_warn!("proxy: failed to read playlist body for {}: {}", resolved, e);
                return bad_gateway();
            }
        };
        let rewritten = rewrite_playlist(&text, &resolved, &state.proxy_base_url);
        return build_response(status, Body::from(rewritten), "application/vnd.apple.mpegurl".to_string(), None, None);
    }

    let forced_type = content_type.unwrap_or_else(|| "video/mp4".to_string());
    let body = Body::from_stream(upstream.bytes_stream());
    build_response(status, body, forced_type, content_length, content_range)
}

fn build_response(
    status: StatusCode,
    body: Body,
    content_type: String,
    content_length: Option<String>,
    content_range: Option<String>,
) -> Response {
    let mut response = Response::builder().status(status);

    if let Some(headers) = response.headers_mut() {
        insert(headers, header::CONTENT_TYPE, &content_type);
        insert(headers, header::ACCEPT_RANGES, "bytes");
        insert(headers, header::CONTENT_DISPOSITION, "inline");
        insert(headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
        insert(
            headers,
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            "Content-Length, Content-Range, Accept-Ranges",
        );
        insert(headers, header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, OPTIONS");
        insert(headers, header::ACCESS_CONTROL_ALLOW_HEADERS, "Range");

        if let Some(len) = &content_length {
            insert(headers, header::CONTENT_LENGTH, len);
        }
        if let Some(range) = &content_range {
            insert(headers, header::CONTENT_RANGE, range);
        }
    }

    response.body(body).unwrap_or_else(|_| bad_gateway())
}

fn insert(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(name, v);
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": "Bad Request", "message": message})),
    )
        .into_response()
}

fn bad_gateway() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({"success": false, "error": "Bad Gateway", "message": "upstream fetch failed"})),
    )
        .into_response()
}

/// Two-hop resolution (§4.10): durable-store URLs redirect to a signed CDN
/// URL; one extra hop mid-range-response breaks seeking on some CDNs, so we
/// resolve the final location with a HEAD up front and fetch that directly.
async fn resolve_target(state: &ProxyState, url: &str) -> Result<String, reqwest::Error> {
    let host = url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string));

    let Some(host) = host else {
        return Ok(url.to_string());
    };

    if !state.is_durable_store_host(&host) {
        return Ok(url.to_string());
    }

    let resp = state
        .http_follow
        .head(url)
        .header(header::USER_AGENT, BROWSER_UA)
        .send()
        .await?;

    Ok(resp.url().to_string())
}
