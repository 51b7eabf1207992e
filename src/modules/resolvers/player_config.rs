use once_cell::sync::Lazy;
use regex::Regex;

use crate::log_warn;
use crate::modules::resolvers::types::{ResolveCtx, RESOLVER_HTTP};

static PLAYER_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:player\.src|file)\s*[:(]\s*\{?[^"']*["'](?P<url>https?://[^"']+)["']"#).unwrap());

/// Resolves a host embedding a `videojs`/`jwplayer` setup call in the page,
/// reading the literal `file:`/`player.src({...})` URL.
pub async fn resolve(ctx: &ResolveCtx) -> Option<String> {
    let mut req = RESOLVER_HTTP.get(&ctx.embed_url);
    if let Some(referer) = &ctx.referer {
        req = req.header("Referer", referer);
    }

    let body = match req.send().await {
        Ok(r) => match r.text().await {
            Ok(b) => b,
            Err(e) => {
                log_warn!("player_config: body read failed: {}", e);
                return None;
            }
        },
        Err(e) => {
            log_warn!("player_config: fetch failed for {}: {}", ctx.embed_url, e);
            return None;
        }
    };

    PLAYER_SRC
        .captures(&body)
        .and_then(|c| c.name("url"))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_src_regex_extracts_jwplayer_file() {
        let html = r#"jwplayer("player").setup({file: "https://cdn.example/v.mp4"});"#;
        let caps = PLAYER_SRC.captures(html).unwrap();
        assert_eq!(caps.name("url").unwrap().as_str(), "https://cdn.example/v.mp4");
    }
}
