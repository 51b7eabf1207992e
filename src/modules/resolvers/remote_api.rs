use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::{json, Value};

use crate::log_warn;
use crate::modules::resolvers::types::{ResolveCtx, RESOLVER_HTTP};

static NODE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]id=(?P<id>\d+)").unwrap());

/// Resolves a host exposing a batch content-URL endpoint: parse the node id
/// out of the embed URL, `POST` a single-command batch, read
/// `result[0].g`. A numeric negative result is a typed error.
pub async fn resolve(ctx: &ResolveCtx, api_base: &str) -> Option<String> {
    let node_id: i64 = NODE_ID
        .captures(&ctx.embed_url)
        .and_then(|c| c.name("id"))
        .and_then(|m| m.as_str().parse().ok())?;

    let request_id = hex_request_id();
    let url = format!("{}?r={}", api_base.trim_end_matches('/'), request_id);
    let body = json!([{"a": "g", "g": 1, "p": node_id}]);

    let resp = match RESOLVER_HTTP.post(&url).json(&body).send().await {
        Ok(r) => r,
        Err(e) => {
            log_warn!("remote_api: request failed for node {}: {}", node_id, e);
            return None;
        }
    };

    let parsed: Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => {
            log_warn!("remote_api: decode failed for node {}: {}", node_id, e);
            return None;
        }
    };

    let result = parsed.get("result")?.get(0)?;

    if let Some(code) = result.as_i64() {
        log_warn!("remote_api: node {} returned error code {}", node_id, describe_error(code));
        return None;
    }

    result.get("g").and_then(|g| g.as_str()).map(str::to_string)
}

fn describe_error(code: i64) -> &'static str {
    match code {
        -9 => "not found",
        -17 => "too many connections",
        _ => "unknown error",
    }
}

fn hex_request_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:x}", rng.gen_range(0..16))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_regex_extracts_numeric_id() {
        let ctx = ResolveCtx::new("https://host.example/embed?id=4821");
        let id = NODE_ID
            .captures(&ctx.embed_url)
            .and_then(|c| c.name("id"))
            .map(|m| m.as_str());
        assert_eq!(id, Some("4821"));
    }

    #[test]
    fn describe_error_names_known_codes() {
        assert_eq!(describe_error(-9), "not found");
        assert_eq!(describe_error(-17), "too many connections");
    }
}
