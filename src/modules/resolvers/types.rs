use std::time::Duration;

use once_cell::sync::Lazy;

pub const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub static RESOLVER_HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(BROWSER_UA)
        .timeout(Duration::from_secs(20))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .expect("failed to build resolver http client")
});

/// Everything a resolver needs: the embed URL and, when the source page is
/// known (it usually is — the provider's episode page), a Referer to send.
#[derive(Debug, Clone)]
pub struct ResolveCtx {
    pub embed_url: String,
    pub referer: Option<String>,
}

impl ResolveCtx {
    pub fn new(embed_url: impl Into<String>) -> Self {
        Self {
            embed_url: embed_url.into(),
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}
