use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::modules::mapping::Mapping;
use crate::shared::errors::AppError;

pub type CoalescedResult = Result<Mapping, Arc<AppError>>;
type CoalescedFuture = Shared<BoxFuture<'static, CoalescedResult>>;

struct Slot {
    token: u64,
    future: CoalescedFuture,
}

/// Request-coalescing lock keyed `provider:slug` or `mal:<id>` (§4.6,
/// §4.6.2, §9). A genuine upgrade over the teacher's `ProviderCache::
/// is_request_in_progress` marker-plus-poll pattern: here every concurrent
/// caller for the same key awaits the *same* `Shared` future and gets the
/// real result, not just a "someone else is working on it" signal.
pub struct CoalesceLock {
    inflight: DashMap<String, Slot>,
    next_token: AtomicU64,
}

impl CoalesceLock {
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
            next_token: AtomicU64::new(0),
        }
    }

    /// Runs `make` at most once per key among overlapping callers. `make`
    /// is only invoked by whichever caller first claims the slot; the
    /// slot is removed once that caller's future resolves, so the next
    /// fresh lookup starts a new discovery.
    pub async fn run<F>(&self, key: String, make: F) -> CoalescedResult
    where
        F: FnOnce() -> BoxFuture<'static, CoalescedResult>,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut owner = false;

        let shared = {
            let entry = self.inflight.entry(key.clone()).or_insert_with(|| {
                owner = true;
                Slot {
                    token,
                    future: make().shared(),
                }
            });
            entry.future.clone()
        };

        let result = shared.await;

        if owner {
            self.inflight.remove_if(&key, |_, slot| slot.token == token);
        }

        result
    }
}

impl Default for CoalesceLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    use chrono::Utc;

    use super::*;

    fn sample_mapping() -> Mapping {
        Mapping {
            mal_id: 1,
            title_main: "Test".to_string(),
            slug_animasu: None,
            slug_samehadaku: None,
            slug_otakudesu: None,
            phash_v1: None,
            release_year: None,
            total_episodes: None,
            last_sync: Utc::now(),
        }
    }

    #[tokio::test]
    async fn concurrent_callers_for_the_same_key_invoke_make_once() {
        let lock = Arc::new(CoalesceLock::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                lock.run("mal:1".to_string(), move || {
                    calls.fetch_add(1, AtomicOrdering::SeqCst);
                    Box::pin(async { Ok(sample_mapping()) })
                })
                .await
            }));
        }

        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }

        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_later_call_after_completion_runs_again() {
        let lock = CoalesceLock::new();
        let calls = AtomicU32::new(0);

        lock.run("mal:1".to_string(), || {
            calls.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async { Ok(sample_mapping()) })
        })
        .await
        .unwrap();

        lock.run("mal:1".to_string(), || {
            calls.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async { Ok(sample_mapping()) })
        })
        .await
        .unwrap();

        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }
}
