use std::time::Duration;

use crate::modules::mal::types::MalFull;
use crate::shared::utils::TtlCache;

/// MAL's own response cache, distinct from the enrichment pipeline's
/// per-episode scrape cache (§4.7). Keyed by `mal_id`.
#[derive(Clone)]
pub struct MalResponseCache {
    inner: TtlCache<i32, MalFull>,
}

impl MalResponseCache {
    pub fn new() -> Self {
        Self {
            inner: TtlCache::new(Duration::from_secs(3600), 5_000),
        }
    }

    pub fn get(&self, mal_id: i32) -> Option<MalFull> {
        self.inner.get(&mal_id)
    }

    pub fn insert(&self, mal_id: i32, full: MalFull) {
        self.inner.insert(mal_id, full);
    }
}

impl Default for MalResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
