use std::collections::HashMap;
use std::time::Duration;

use crate::modules::streaming::types::StreamingServer;
use crate::shared::utils::TtlCache;

/// Per-episode scrape cache keyed `mal_id:episode`. Reuses the teacher's
/// `ProviderCache` shape (`TtlCache` + background sweep), retargeted to
/// store per-provider server lists instead of `Vec<AnimeDetailed>` (§4.7).
pub struct ScrapeCache {
    inner: TtlCache<String, HashMap<String, Vec<StreamingServer>>>,
}

impl ScrapeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlCache::new(ttl, 2_000),
        }
    }

    pub fn key(mal_id: i32, episode: i32) -> String {
        format!("{}:{}", mal_id, episode)
    }

    pub fn get(&self, mal_id: i32, episode: i32) -> Option<HashMap<String, Vec<StreamingServer>>> {
        self.inner.get(&Self::key(mal_id, episode))
    }

    pub fn insert(&self, mal_id: i32, episode: i32, value: HashMap<String, Vec<StreamingServer>>) {
        self.inner.insert(Self::key(mal_id, episode), value);
    }

    pub fn invalidate(&self, mal_id: i32, episode: i32) {
        self.inner.invalidate(&Self::key(mal_id, episode));
    }
}
