use url::Url;

/// Rewrites every non-comment, non-blank URI in an HLS playlist to route
/// back through this proxy (§4.10). Relative URIs are absolutised against
/// `playlist_url` first; recursion terminates naturally once a line is a
/// media segment rather than another playlist.
pub fn rewrite_playlist(text: &str, playlist_url: &str, proxy_base_url: &str) -> String {
    let base = match Url::parse(playlist_url) {
        Ok(u) => u,
        Err(_) => return text.to_string(),
    };

    text.lines()
        .map(|line| {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                return line.to_string();
            }

            let absolute = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                trimmed.to_string()
            } else {
                match base.join(trimmed) {
                    Ok(resolved) => resolved.to_string(),
                    Err(_) => return line.to_string(),
                }
            };

            format!(
                "{}/proxy?url={}",
                proxy_base_url.trim_end_matches('/'),
                urlencoding::encode(&absolute)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn looks_like_hls(url: &str, content_type: Option<&str>) -> bool {
    if url.ends_with(".m3u8") {
        return true;
    }
    matches!(
        content_type,
        Some("application/vnd.apple.mpegurl") | Some("application/x-mpegurl")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_relative_segment_uris_through_the_proxy() {
        let playlist = "#EXTM3U\n#EXT-X-VERSION:3\nseg0.ts\nseg1.ts\n";
        let out = rewrite_playlist(playlist, "https://cdn.example/show/ep1/index.m3u8", "https://px.example");

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert!(lines[2].starts_with("https://px.example/proxy?url="));
        assert!(lines[2].contains(&urlencoding::encode("https://cdn.example/show/ep1/seg0.ts").to_string()));
    }

    #[test]
    fn leaves_comments_and_blank_lines_untouched() {
        let playlist = "#EXTM3U\n\n#EXT-X-ENDLIST\n";
        let out = rewrite_playlist(playlist, "https://cdn.example/a/b.m3u8", "https://px.example");
        assert_eq!(out, playlist.lines().collect::<Vec<_>>().join("\n"));
    }

    #[test]
    fn absolute_segment_uris_pass_through_unmodified_host() {
        let playlist = "#EXTM3U\nhttps://other.example/seg0.ts\n";
        let out = rewrite_playlist(playlist, "https://cdn.example/a/b.m3u8", "https://px.example");
        assert!(out.contains(&urlencoding::encode("https://other.example/seg0.ts").to_string()));
    }

    #[test]
    fn looks_like_hls_matches_extension_or_media_type() {
        assert!(looks_like_hls("https://cdn.example/a.m3u8", None));
        assert!(looks_like_hls("https://cdn.example/a.ts", Some("application/x-mpegurl")));
        assert!(!looks_like_hls("https://cdn.example/a.mp4", Some("video/mp4")));
    }
}
