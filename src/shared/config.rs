use std::env;
use std::time::Duration;

use crate::log_info;
use crate::shared::errors::AppError;

/// Process-wide configuration, loaded once at startup from the environment.
/// Every field here corresponds to a Configuration entry in the external
/// interfaces contract; a missing required variable fails the process at
/// startup rather than surfacing a confusing error mid-request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub api_port: u16,
    pub worker_port: u16,
    pub proxy_port: u16,
    pub api_base_url: String,
    pub worker_base_url: String,
    pub proxy_base_url: String,
    pub archival_salt: String,
    pub scrape_cache_ttl: Duration,
    pub mal_throttle: Duration,
    pub phash_threshold: u32,
    pub title_similarity_threshold: f64,
    pub episode_tolerance: i32,
    pub storage_targets: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = required("DATABASE_URL")?;
        let api_port = parse_or("API_PORT", 8080)?;
        let worker_port = parse_or("WORKER_PORT", 8081)?;
        let proxy_port = parse_or("PROXY_PORT", 8082)?;
        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{}", api_port));
        let worker_base_url = env::var("WORKER_BASE_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{}", worker_port));
        let proxy_base_url = env::var("PROXY_BASE_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{}", proxy_port));
        let archival_salt = required("ARCHIVAL_SALT")?;

        let scrape_cache_ttl_secs: u64 = parse_or("SCRAPE_CACHE_TTL_SECS", 1200)?;
        let mal_throttle_ms: u64 = parse_or("MAL_THROTTLE_MS", 400)?;
        let phash_threshold: u32 = parse_or("PHASH_THRESHOLD", 5)?;
        let title_similarity_threshold: f64 = parse_or("TITLE_SIMILARITY_THRESHOLD", 0.85)?;
        let episode_tolerance: i32 = parse_or("EPISODE_TOLERANCE", 2)?;

        let storage_targets = env::var("STORAGE_TARGETS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        log_info!(
            "Configuration loaded: api_port={} worker_port={} proxy_port={}",
            api_port,
            worker_port,
            proxy_port
        );

        Ok(Self {
            database_url,
            api_port,
            worker_port,
            proxy_port,
            api_base_url,
            worker_base_url,
            proxy_base_url,
            archival_salt,
            scrape_cache_ttl: Duration::from_secs(scrape_cache_ttl_secs),
            mal_throttle: Duration::from_millis(mal_throttle_ms),
            phash_threshold,
            title_similarity_threshold,
            episode_tolerance,
            storage_targets,
        })
    }
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name)
        .map_err(|_| AppError::InternalError(format!("{} environment variable not found", name)))
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::InternalError(format!("invalid {} value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
