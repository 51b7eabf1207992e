use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::interval;

use crate::log_debug;

struct CacheEntry<V> {
    data: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// A `DashMap`-backed TTL cache with atomic hit/miss counters and a
/// background sweep task, started lazily on first insert. Shared by the
/// MAL client's own response cache and the per-episode scrape cache.
pub struct TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    entries: Arc<DashMap<K, CacheEntry<V>>>,
    default_ttl: Duration,
    max_entries: usize,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    cleanup_started: Arc<AtomicBool>,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
            max_entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            cleanup_started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.data.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        if self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                data: value,
                created_at: Instant::now(),
                ttl,
            },
        );
        self.start_cleanup_task();
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn evict_oldest(&self) {
        let target = (self.max_entries * 9) / 10;
        if self.entries.len() <= target {
            return;
        }
        let mut ages: Vec<(K, Instant)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().created_at))
            .collect();
        ages.sort_by_key(|(_, created_at)| *created_at);
        for (key, _) in ages.into_iter().take(self.entries.len() - target) {
            self.entries.remove(&key);
        }
    }

    fn start_cleanup_task(&self) {
        if self
            .cleanup_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(300));
            loop {
                ticker.tick().await;
                let before = entries.len();
                entries.retain(|_, entry| !entry.is_expired());
                let removed = before - entries.len();
                if removed > 0 {
                    log_debug!("ttl_cache: swept {} expired entries", removed);
                }
            }
        });
    }
}

impl<K, V> Clone for TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
            max_entries: self.max_entries,
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
            cleanup_started: Arc::clone(&self.cleanup_started),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_returns_value_before_expiry() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60), 100);
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_millis(1), 100);
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get(&"a".to_string()), None);
    }
}
