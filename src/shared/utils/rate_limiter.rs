use crate::shared::errors::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Single-slot minimum-inter-request gap throttle. Callers serialise on the
/// mutex; each `wait()` advances the gap regardless of the outcome of the
/// call it guards.
pub struct RateLimiter {
    last_request: Arc<Mutex<Instant>>,
    min_interval: Duration,
    requests_per_second: f64,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second);
        Self {
            last_request: Arc::new(Mutex::new(Instant::now() - min_interval)),
            min_interval,
            requests_per_second,
        }
    }

    pub fn from_interval(min_interval: Duration) -> Self {
        Self {
            last_request: Arc::new(Mutex::new(Instant::now() - min_interval)),
            min_interval,
            requests_per_second: 1.0 / min_interval.as_secs_f64(),
        }
    }

    pub async fn wait(&self) -> Result<(), AppError> {
        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(*last);

        if elapsed < self.min_interval {
            let wait_time = self.min_interval - elapsed;
            sleep(wait_time).await;
        }

        *last = Instant::now();
        Ok(())
    }

    pub fn get_info(&self) -> RateLimiterInfo {
        RateLimiterInfo {
            requests_per_second: self.requests_per_second,
            min_interval_ms: self.min_interval.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RateLimiterInfo {
    pub requests_per_second: f64,
    pub min_interval_ms: u64,
}
