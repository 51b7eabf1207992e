use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::interval;

use crate::log_error;
use crate::log_info;
use crate::modules::archival::domain::{QueueEntry, QueueStatus, StoreUpsert};
use crate::modules::archival::download::download;
use crate::modules::archival::file_key::file_key;
use crate::modules::archival::repository::ArchivalRepository;
use crate::modules::archival::storage::StorageTarget;
use crate::modules::resolvers::{self, ResolveCtx};
use crate::shared::errors::AppResult;

const MAX_CONCURRENT_JOBS: usize = 2;
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Downloads and archives claimed queue entries, bounded to
/// `MAX_CONCURRENT_JOBS` in flight across both the poll loop and
/// webhook-triggered jobs (§4.9, §5).
pub struct ArchivalWorker {
    repo: Arc<ArchivalRepository>,
    targets: Vec<Arc<dyn StorageTarget>>,
    salt: String,
    api_base_url: String,
    proxy_base_url: String,
    semaphore: Arc<Semaphore>,
}

impl ArchivalWorker {
    pub fn new(
        repo: Arc<ArchivalRepository>,
        targets: Vec<Arc<dyn StorageTarget>>,
        salt: String,
        api_base_url: String,
        proxy_base_url: String,
    ) -> Self {
        Self {
            repo,
            targets,
            salt,
            api_base_url,
            proxy_base_url,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_JOBS)),
        }
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Runs the poll loop forever. Call `trigger` separately for
    /// webhook-triggered jobs; both share the same semaphore.
    pub async fn run_poll_loop(self: Arc<Self>) {
        let mut ticker = interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            match self.repo.claim(MAX_CONCURRENT_JOBS as i64).await {
                Ok(entries) => {
                    for entry in entries {
                        let worker = Arc::clone(&self);
                        tokio::spawn(async move {
                            worker.run_job(entry).await;
                        });
                    }
                }
                Err(e) => log_error!("archival worker: claim failed: {}", e),
            }
        }
    }

    /// `POST /trigger` entry point (§6): enqueue-then-nudge already happened
    /// on the API side, this just claims and runs immediately instead of
    /// waiting for the next poll tick.
    pub async fn trigger(self: &Arc<Self>, mal_id: i32, episode: i32, provider: &str, resolution: Option<&str>) {
        match self.repo.find_queue_entry(mal_id, episode, provider, resolution).await {
            Ok(Some(entry)) if entry.status != QueueStatus::Ready => {
                let worker = Arc::clone(self);
                tokio::spawn(async move {
                    worker.run_job(entry).await;
                });
            }
            Ok(_) => {}
            Err(e) => log_error!("archival worker: trigger lookup failed: {}", e),
        }
    }

    pub async fn status_counts(&self) -> AppResult<crate::modules::archival::QueueCounts> {
        self.repo.status_counts().await
    }

    async fn run_job(&self, entry: QueueEntry) {
        let _permit = self.semaphore.acquire().await.expect("semaphore closed");

        match self.process(&entry).await {
            Ok(()) => {
                log_info!(
                    "archival worker: {} ep{} {} archived",
                    entry.mal_id,
                    entry.episode,
                    entry.provider
                );
                self.fire_invalidation(entry.mal_id, entry.episode).await;
            }
            Err(e) => {
                log_error!(
                    "archival worker: job {} failed: {}",
                    entry.id,
                    e
                );
                let _ = self
                    .repo
                    .update_status(entry.id, QueueStatus::Failed, Some(&e.to_string()))
                    .await;
            }
        }
    }

    async fn process(&self, entry: &QueueEntry) -> AppResult<()> {
        let direct_url = if resolvers::requires_embed_url_for_download(&entry.video_url) {
            resolvers::dispatch(&ResolveCtx::new(entry.video_url.clone()))
                .await
                .ok_or_else(|| {
                    crate::shared::errors::AppError::ExternalServiceError(
                        "re-resolve failed for archival download".to_string(),
                    )
                })?
        } else {
            entry.video_url.clone()
        };

        self.repo
            .update_status(entry.id, QueueStatus::Downloading, None)
            .await?;
        let bytes = download(&direct_url).await?;

        self.repo
            .update_status(entry.id, QueueStatus::Uploading, None)
            .await?;

        let key = file_key(
            &self.salt,
            entry.mal_id,
            entry.episode,
            &entry.provider,
            entry.resolution.as_deref(),
        );
        let object_key = format!(
            "tricrawl-{}/{}/ep{}/{}.mp4",
            entry.mal_id, entry.mal_id, entry.episode, key
        );

        let mut primary: Option<(String, String)> = None;
        for target in &self.targets {
            match target.upload(&object_key, &bytes).await {
                Ok(result) => {
                    if primary.is_none() {
                        primary = Some((target.repo_id().to_string(), result.direct_url));
                    }
                }
                Err(e) => log_error!("archival worker: upload to {} failed: {}", target.repo_id(), e),
            }
        }

        let (repo_id, direct_url) = primary.ok_or_else(|| {
            crate::shared::errors::AppError::ExternalServiceError(
                "every storage target rejected the upload".to_string(),
            )
        })?;

        let stream_url = format!(
            "{}/proxy?url={}",
            self.proxy_base_url.trim_end_matches('/'),
            urlencoding::encode(&direct_url)
        );

        self.repo
            .upsert_store(StoreUpsert {
                mal_id: entry.mal_id,
                episode: entry.episode,
                provider: entry.provider.clone(),
                resolution: entry.resolution.clone(),
                file_key: key,
                account_index: 0,
                repo_id,
                path: object_key,
                direct_url,
                stream_url,
            })
            .await?;

        Ok(())
    }

    /// Best-effort notification to the enrichment pipeline that it can drop
    /// its scrape-cache entry for this episode; a swallowed timeout is
    /// intentional (§4.9, §5).
    async fn fire_invalidation(&self, mal_id: i32, episode: i32) {
        let url = format!(
            "{}/api/v1/streaming/invalidate",
            self.api_base_url.trim_end_matches('/')
        );
        let salt = self.salt.clone();
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            let _ = client
                .post(&url)
                .timeout(Duration::from_secs(5))
                .json(&serde_json::json!({"mal_id": mal_id, "episode": episode, "secret": salt}))
                .send()
                .await;
        });
    }
}
