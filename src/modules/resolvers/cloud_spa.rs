use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::log_warn;
use crate::modules::resolvers::types::{ResolveCtx, RESOLVER_HTTP};

static DATA_PAGE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-page="(?P<json>[^"]+)""#).unwrap());

/// Resolves a host that ships its player state as an HTML-entity-encoded
/// JSON blob on a `data-page` attribute (the SPA-hydration pattern), reading
/// `props.url` out of the decoded payload.
pub async fn resolve(ctx: &ResolveCtx) -> Option<String> {
    let mut req = RESOLVER_HTTP.get(&ctx.embed_url);
    if let Some(referer) = &ctx.referer {
        req = req.header("Referer", referer);
    }

    let body = match req.send().await {
        Ok(r) => match r.text().await {
            Ok(b) => b,
            Err(e) => {
                log_warn!("cloud_spa: body read failed: {}", e);
                return None;
            }
        },
        Err(e) => {
            log_warn!("cloud_spa: fetch failed for {}: {}", ctx.embed_url, e);
            return None;
        }
    };

    let caps = DATA_PAGE_ATTR.captures(&body)?;
    let encoded = caps.name("json")?.as_str();
    let decoded = decode_html_entities(encoded);

    let value: Value = serde_json::from_str(&decoded).ok()?;
    value
        .get("props")
        .and_then(|p| p.get("url"))
        .and_then(|u| u.as_str())
        .map(str::to_string)
}

fn decode_html_entities(input: &str) -> String {
    input
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_html_entities_handles_common_escapes() {
        let raw = "{&quot;props&quot;:{&quot;url&quot;:&quot;https://x/y&quot;}}";
        let decoded = decode_html_entities(raw);
        let value: Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(
            value["props"]["url"].as_str(),
            Some("https://x/y")
        );
    }
}
