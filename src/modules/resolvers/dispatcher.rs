use once_cell::sync::Lazy;

use crate::modules::resolvers::types::ResolveCtx;
use crate::modules::resolvers::{cloud_spa, packed_js, player_config, remote_api};

enum HostMatcher {
    Suffix(&'static str),
    Contains(&'static str),
}

impl HostMatcher {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostMatcher::Suffix(suffix) => host.ends_with(suffix),
            HostMatcher::Contains(fragment) => host.contains(fragment),
        }
    }
}

/// Which concrete resolver a host family maps to. A closed enum rather than
/// `dyn Trait` or function pointers — the host set is small and known at
/// compile time (§9's "no inheritance hierarchy" design note).
#[derive(Clone, Copy)]
enum ResolverKind {
    PackedJs,
    CloudSpa,
    PlayerConfig,
    RemoteApi,
}

const REMOTE_API_BASE: &str = "https://api.mega-embed.example/embed/rest";

/// Registry built once at process start: a closed, linearly-scanned table
/// from host predicate to resolver kind.
static DISPATCH_TABLE: Lazy<Vec<(HostMatcher, ResolverKind)>> = Lazy::new(|| {
    vec![
        (HostMatcher::Suffix("filemoon.sx"), ResolverKind::PackedJs),
        (HostMatcher::Suffix("streamtape.com"), ResolverKind::PackedJs),
        (HostMatcher::Contains("kraken"), ResolverKind::CloudSpa),
        (HostMatcher::Contains("vidhide"), ResolverKind::PlayerConfig),
        (HostMatcher::Contains("mega"), ResolverKind::RemoteApi),
    ]
});

/// Dispatch an embed URL to the resolver registered for its host, or `None`
/// for an unrecognised host. Never panics or propagates an error — an
/// unresolved embed just yields a null `resolved_url` upstream (§4.7).
pub async fn dispatch(ctx: &ResolveCtx) -> Option<String> {
    let host = extract_host(&ctx.embed_url)?;

    let kind = DISPATCH_TABLE
        .iter()
        .find(|(matcher, _)| matcher.matches(&host))
        .map(|(_, kind)| *kind)?;

    match kind {
        ResolverKind::PackedJs => packed_js::resolve(ctx).await,
        ResolverKind::CloudSpa => cloud_spa::resolve(ctx).await,
        ResolverKind::PlayerConfig => player_config::resolve(ctx).await,
        ResolverKind::RemoteApi => remote_api::resolve(ctx, REMOTE_API_BASE).await,
    }
}

fn extract_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// §4.7's download-URL policy: the remote-API family is ASN-bound (the
/// downloader must re-resolve in its own network context) and the
/// AES-keyed cloud family carries its key in the URL fragment, which the
/// enqueue path never sees — both enqueue the embed URL, not the resolved
/// one.
pub fn requires_embed_url_for_download(embed_url: &str) -> bool {
    match extract_host(embed_url) {
        Some(host) => host.contains("mega") || host.contains("kraken"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_host_matches_nothing() {
        let kind = DISPATCH_TABLE
            .iter()
            .find(|(matcher, _)| matcher.matches("totally-unknown-host.example"));
        assert!(kind.is_none());
    }

    #[test]
    fn known_suffix_host_resolves_to_packed_js() {
        let matched = DISPATCH_TABLE
            .iter()
            .any(|(matcher, _)| matcher.matches("embed.filemoon.sx"));
        assert!(matched);
    }
}
