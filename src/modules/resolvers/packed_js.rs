use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::log_warn;
use crate::modules::resolvers::types::{ResolveCtx, RESOLVER_HTTP};

static PACKED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)eval\(function\(p,a,c,k,e,d\)\{.*?\}\('(?P<p>.*)',(?P<a>\d+),(?P<c>\d+),'(?P<k>[^']*)'\.split\('\|'\)",
    )
    .unwrap()
});

static LINKS_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)links\s*[:=]\s*\{(?P<body>.*?)\}"#).unwrap());
static LINK_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?P<key>hls2|hls4|hls3)\s*:\s*["']([^"']+)["']"#).unwrap());
static BARE_M3U8: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^"'\s\\]+\.m3u8[^"'\s\\]*"#).unwrap());
static STREAM_INF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#EXT-X-STREAM-INF").unwrap());

/// Resolves an embed URL served behind a Dean-Edwards-packed script that
/// eventually reveals an HLS master playlist (§4.5).
pub async fn resolve(ctx: &ResolveCtx) -> Option<String> {
    let mut req = RESOLVER_HTTP.get(&ctx.embed_url);
    if let Some(referer) = &ctx.referer {
        req = req.header("Referer", referer);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            log_warn!("packed_js: fetch failed for {}: {}", ctx.embed_url, e);
            return None;
        }
    };

    let final_url = resp.url().to_string();
    let body = match resp.text().await {
        Ok(b) => b,
        Err(e) => {
            log_warn!("packed_js: body read failed: {}", e);
            return None;
        }
    };

    let unpacked = unpack_from_html(&body)?;
    let master = extract_master_url(&unpacked, &final_url)?;

    match fetch_first_variant(&master).await {
        Some(sub) => Some(sub),
        None => Some(master),
    }
}

fn unpack_from_html(html: &str) -> Option<String> {
    let caps = PACKED_BLOCK.captures(html)?;
    let payload = caps.name("p")?.as_str();
    let radix: u32 = caps.name("a")?.as_str().parse().ok()?;
    let count: usize = caps.name("c")?.as_str().parse().ok()?;
    let keywords: Vec<&str> = caps.name("k")?.as_str().split('|').collect();

    Some(unpack(payload, radix, count, &keywords))
}

fn unpack(payload: &str, radix: u32, count: usize, keywords: &[&str]) -> String {
    let mut out = payload.to_string();

    for c in (0..count).rev() {
        let token = to_radix_string(c as u32, radix);
        let replacement = keywords.get(c).copied().unwrap_or("");
        if replacement.is_empty() {
            continue;
        }
        if let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(&token))) {
            out = re.replace_all(&out, replacement).to_string();
        }
    }

    out
}

const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_radix_string(mut n: u32, radix: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % radix) as usize] as char);
        n /= radix;
    }
    digits.iter().rev().collect()
}

/// Pull an m3u8 URL out of the unpacked `links` object (priority
/// hls2/hls4/hls3), falling back to any bare m3u8 literal. Relative paths
/// are absolutised against the post-redirect page URL.
fn extract_master_url(unpacked: &str, base_url: &str) -> Option<String> {
    let candidate = if let Some(caps) = LINKS_OBJECT.captures(unpacked) {
        let body = caps.name("body")?.as_str();
        ["hls2", "hls4", "hls3"]
            .iter()
            .find_map(|key| {
                LINK_FIELD.captures_iter(body).find_map(|c| {
                    if c.name("key").map(|m| m.as_str()) == Some(*key) {
                        c.get(2).map(|m| m.as_str().to_string())
                    } else {
                        None
                    }
                })
            })
            .or_else(|| BARE_M3U8.find(unpacked).map(|m| m.as_str().to_string()))
    } else {
        BARE_M3U8.find(unpacked).map(|m| m.as_str().to_string())
    }?;

    absolutise(&candidate, base_url)
}

fn absolutise(maybe_relative: &str, base_url: &str) -> Option<String> {
    if Url::parse(maybe_relative).is_ok() {
        return Some(maybe_relative.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(maybe_relative).ok().map(|u| u.to_string())
}

/// Fetch the master playlist and return the first non-comment sub-playlist
/// line, absolutised, or `None` if the master can't be fetched.
async fn fetch_first_variant(master_url: &str) -> Option<String> {
    let body = RESOLVER_HTTP.get(master_url).send().await.ok()?.text().await.ok()?;

    let mut take_next = false;
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if STREAM_INF.is_match(line) {
            take_next = true;
            continue;
        }
        if take_next {
            return absolutise(line, master_url);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_radix_string_round_trips_small_values() {
        assert_eq!(to_radix_string(0, 36), "0");
        assert_eq!(to_radix_string(35, 36), "z");
        assert_eq!(to_radix_string(36, 36), "10");
    }

    #[test]
    fn extract_master_url_prefers_hls2_over_bare_literal() {
        let unpacked = r#"var links = {hls4:"b.m3u8", hls2:"a.m3u8"};"#;
        let url = extract_master_url(unpacked, "https://host.example/page").unwrap();
        assert_eq!(url, "https://host.example/a.m3u8");
    }

    #[test]
    fn extract_master_url_falls_back_to_bare_literal() {
        let unpacked = r#"console.log("https://cdn.example/master.m3u8?x=1");"#;
        let url = extract_master_url(unpacked, "https://host.example/page").unwrap();
        assert_eq!(url, "https://cdn.example/master.m3u8?x=1");
    }
}
