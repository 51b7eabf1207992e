use std::time::Duration;

use serde::Deserialize;

/// Shared across every proxy handler: one pooled `reqwest::Client` plus the
/// handful of facts the handlers need that never change at runtime (§4.10).
#[derive(Clone)]
pub struct ProxyState {
    pub http: reqwest::Client,
    pub http_follow: reqwest::Client,
    pub proxy_base_url: String,
    pub storage_hosts: Vec<String>,
}

impl ProxyState {
    pub fn new(proxy_base_url: String, storage_targets: &[String]) -> Self {
        let storage_hosts = storage_targets
            .iter()
            .filter_map(|target| url::Url::parse(target).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();

        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("failed to build proxy http client"),
            http_follow: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("failed to build proxy resolve http client"),
            proxy_base_url,
            storage_hosts,
        }
    }

    /// Whether `host` belongs to one of the configured durable-storage
    /// targets and therefore needs the two-hop resolve-then-fetch dance.
    pub fn is_durable_store_host(&self, host: &str) -> bool {
        self.storage_hosts.iter().any(|h| h == host)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: String,
}
