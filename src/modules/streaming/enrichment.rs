use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::log_warn;
use crate::modules::archival::{ArchivalRepository, QueueStatus};
use crate::modules::mapping::Mapping;
use crate::modules::resolvers::{self, ResolveCtx};
use crate::modules::streaming::cache::ScrapeCache;
use crate::modules::streaming::sites::{self, Site};
use crate::modules::streaming::types::StreamingServer;

/// Per-request entry point for §4.7: scrape (cached), resolve, then
/// store-check/enqueue every server, every time.
pub struct StreamingService {
    cache: ScrapeCache,
    archival: Arc<ArchivalRepository>,
    worker_base_url: String,
    proxy_base_url: String,
    archival_salt: String,
}

impl StreamingService {
    pub fn new(
        scrape_cache_ttl: Duration,
        archival: Arc<ArchivalRepository>,
        worker_base_url: String,
        proxy_base_url: String,
        archival_salt: String,
    ) -> Self {
        Self {
            cache: ScrapeCache::new(scrape_cache_ttl),
            archival,
            worker_base_url,
            proxy_base_url,
            archival_salt,
        }
    }

    pub async fn get_streaming(
        &self,
        mapping: &Mapping,
        episode: i32,
    ) -> HashMap<String, Vec<StreamingServer>> {
        let per_provider = match self.cache.get(mapping.mal_id, episode) {
            Some(cached) => cached,
            None => {
                let fresh = self.scrape_and_resolve(mapping, episode).await;
                self.cache.insert(mapping.mal_id, episode, fresh.clone());
                fresh
            }
        };

        self.enrich_all(per_provider, mapping.mal_id, episode).await
    }

    pub fn invalidate(&self, mal_id: i32, episode: i32) {
        self.cache.invalidate(mal_id, episode);
    }

    async fn scrape_and_resolve(
        &self,
        mapping: &Mapping,
        episode: i32,
    ) -> HashMap<String, Vec<StreamingServer>> {
        let scrapes = mapping.known_providers().into_iter().filter_map(|provider| {
            let slug = mapping.slug_for(provider)?.to_string();
            let site = Site::by_name(provider)?;
            Some(async move {
                let servers = sites::episode_servers(site, &slug, episode).await;
                (site.name().to_string(), servers)
            })
        });

        let scraped: Vec<(String, Vec<StreamingServer>)> = join_all(scrapes).await;

        let mut out = HashMap::new();
        for (provider, servers) in scraped {
            let resolves = servers.iter().map(|server| {
                let ctx = ResolveCtx::new(server.embed_url.clone());
                async move { resolvers::dispatch(&ctx).await }
            });
            let resolved_urls = join_all(resolves).await;

            let resolved_servers = servers
                .into_iter()
                .zip(resolved_urls)
                .map(|(mut server, resolved_url)| {
                    server.resolved_url = resolved_url;
                    server
                })
                .collect();

            out.insert(provider, resolved_servers);
        }

        out
    }

    async fn enrich_all(
        &self,
        per_provider: HashMap<String, Vec<StreamingServer>>,
        mal_id: i32,
        episode: i32,
    ) -> HashMap<String, Vec<StreamingServer>> {
        let mut out = HashMap::new();
        for (provider, servers) in per_provider {
            let mut enriched = Vec::with_capacity(servers.len());
            for server in servers {
                enriched.push(self.enrich_one(server, mal_id, episode).await);
            }
            out.insert(provider, enriched);
        }
        out
    }

    /// Store check (always performed, cache or not) plus idempotent enqueue
    /// on miss (§4.7).
    async fn enrich_one(&self, mut server: StreamingServer, mal_id: i32, episode: i32) -> StreamingServer {
        let resolution = server.resolution.as_deref();

        let store = self
            .archival
            .find_store_entry(mal_id, episode, &server.provider, resolution)
            .await
            .ok()
            .flatten();

        if let Some(entry) = store {
            server.resolved_url = Some(entry.direct_url.clone());
            server.stream_url = Some(self.proxy_url(&entry.direct_url));
            return server;
        }

        server.stream_url = server.resolved_url.as_ref().map(|u| self.proxy_url(u));
        self.maybe_enqueue(&server, mal_id, episode).await;
        server
    }

    fn proxy_url(&self, target: &str) -> String {
        format!(
            "{}/proxy?url={}",
            self.proxy_base_url.trim_end_matches('/'),
            urlencoding::encode(target)
        )
    }

    async fn maybe_enqueue(&self, server: &StreamingServer, mal_id: i32, episode: i32) {
        let resolution = server.resolution.as_deref();

        let existing = self
            .archival
            .find_queue_entry(mal_id, episode, &server.provider, resolution)
            .await
            .ok()
            .flatten();

        let should_enqueue = match existing {
            None => true,
            Some(entry) => entry.status == QueueStatus::Failed,
        };
        if !should_enqueue {
            return;
        }

        // §4.7 download-URL policy: ASN-bound/AES-keyed families enqueue the
        // embed URL so the worker re-resolves in its own network context.
        let download_url = if resolvers::requires_embed_url_for_download(&server.embed_url) {
            server.embed_url.clone()
        } else {
            match &server.resolved_url {
                Some(u) => u.clone(),
                None => return,
            }
        };

        let enqueued = self
            .archival
            .enqueue(mal_id, episode, &server.provider, &download_url, resolution)
            .await;

        if enqueued.is_ok() {
            self.fire_webhook(mal_id, episode, &server.provider, download_url, server.resolution.clone())
                .await;
        }
    }

    /// Best-effort nudge to the archival worker; the scheduled poller is the
    /// durable path (§4.7, §5).
    async fn fire_webhook(
        &self,
        mal_id: i32,
        episode: i32,
        provider: &str,
        video_url: String,
        resolution: Option<String>,
    ) {
        let url = format!("{}/trigger", self.worker_base_url.trim_end_matches('/'));
        let salt = self.archival_salt.clone();
        let provider = provider.to_string();

        tokio::spawn(async move {
            let client = reqwest::Client::new();
            let result = client
                .post(&url)
                .bearer_auth(&salt)
                .timeout(Duration::from_secs(5))
                .json(&serde_json::json!({
                    "mal_id": mal_id,
                    "episode": episode,
                    "provider": provider,
                    "video_url": video_url,
                    "resolution": resolution,
                }))
                .send()
                .await;

            if let Err(e) = result {
                log_warn!("streaming: webhook to archival worker failed (poller will retry): {}", e);
            }
        });
    }
}
