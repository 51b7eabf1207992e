use std::time::Duration;

use serde::Deserialize;

use crate::log_warn;
use crate::modules::mal::cache::MalResponseCache;
use crate::modules::mal::types::{MalCandidate, MalFull, MetadataGate};
use crate::modules::title::{normalise_season, similarity};
use crate::shared::utils::RateLimiter;

const BROWSER_UA: &str = "tricrawl/0.1 (+mapping resolver)";
const DEFAULT_BASE_URL: &str = "https://api.jikan.moe/v4";

/// Throttled Jikan/MAL client. All calls serialise on a single 400ms-gap
/// throttle (§4.3); never retried — a failed attempt just returns `None`.
pub struct MalClient {
    http: reqwest::Client,
    throttle: RateLimiter,
    cache: MalResponseCache,
    base_url: String,
}

impl MalClient {
    pub fn new(throttle_interval: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), throttle_interval)
    }

    pub fn with_base_url(base_url: String, throttle_interval: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_UA)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build mal http client");

        Self {
            http,
            throttle: RateLimiter::from_interval(throttle_interval),
            cache: MalResponseCache::new(),
            base_url,
        }
    }

    /// Multi-query search with fuzzy title ranking. Returns the best
    /// candidate scoring >= 0.85, or `None`.
    pub async fn search_by_title(
        &self,
        raw_title: &str,
        scraped_year: Option<i32>,
    ) -> Option<MalCandidate> {
        let queries = build_query_variants(raw_title);

        let mut best: Option<(f64, MalCandidate)> = None;

        for query in &queries {
            let candidates = self.search_raw(query).await;
            for candidate in candidates {
                let score = best_variant_score(query, &candidate);
                let score = if prefix_relation(query, &candidate) {
                    score.max(0.92)
                } else {
                    score
                };

                let better = match &best {
                    None => true,
                    Some((best_score, best_candidate)) => {
                        if (score - best_score).abs() < f64::EPSILON {
                            year_matches(&candidate, scraped_year)
                                && !year_matches(best_candidate, scraped_year)
                        } else {
                            score > *best_score
                        }
                    }
                };

                if better {
                    best = Some((score, candidate));
                }
            }

            if let Some((score, candidate)) = &best {
                let year_ok = scraped_year.is_none() || year_matches(candidate, scraped_year);
                if *score >= 0.85 && year_ok {
                    break;
                }
            }
        }

        best.filter(|(score, _)| *score >= 0.85).map(|(_, c)| c)
    }

    pub async fn get_by_id(&self, mal_id: i32) -> Option<MalCandidate> {
        if let Some(full) = self.cache.get(mal_id) {
            return Some(full.as_candidate());
        }
        self.get_full_by_id(mal_id).await.map(|f| f.as_candidate())
    }

    pub async fn get_full_by_id(&self, mal_id: i32) -> Option<MalFull> {
        if let Some(full) = self.cache.get(mal_id) {
            return Some(full);
        }

        self.throttle.wait().await.ok()?;

        let url = format!("{}/anime/{}/full", self.base_url, mal_id);
        let resp = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                log_warn!("mal: get_full_by_id({}) request failed: {}", mal_id, e);
                return None;
            }
        };

        if !resp.status().is_success() {
            log_warn!(
                "mal: get_full_by_id({}) returned status {}",
                mal_id,
                resp.status()
            );
            return None;
        }

        let body: JikanSingleResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                log_warn!("mal: get_full_by_id({}) decode failed: {}", mal_id, e);
                return None;
            }
        };

        let full = body.data.into_full();
        self.cache.insert(mal_id, full.clone());
        Some(full)
    }

    /// §4.3 metadata validation gate: unknown fields pass; known fields must
    /// be within tolerance.
    pub fn validate_metadata(
        candidate: &MalCandidate,
        gate: MetadataGate,
        episode_tolerance: i32,
    ) -> bool {
        if let (Some(a), Some(b)) = (candidate.year, gate.year) {
            if (a - b).abs() > 1 {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (candidate.total_episodes, gate.total_episodes) {
            if (a - b).abs() > episode_tolerance {
                return false;
            }
        }
        true
    }

    async fn search_raw(&self, query: &str) -> Vec<MalCandidate> {
        self.throttle.wait().await.ok();

        let url = format!("{}/anime", self.base_url);
        let resp = match self
            .http
            .get(&url)
            .query(&[("q", query), ("limit", "5")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log_warn!("mal: search({}) request failed: {}", query, e);
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            log_warn!("mal: search({}) returned status {}", query, resp.status());
            return Vec::new();
        }

        match resp.json::<JikanSearchResponse>().await {
            Ok(body) => body.data.into_iter().map(JikanAnime::into_candidate).collect(),
            Err(e) => {
                log_warn!("mal: search({}) decode failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

/// Ordered, deduped query variants: raw title, title with the first
/// season/cour/part clause truncated, and the fully normalised form.
fn build_query_variants(raw: &str) -> Vec<String> {
    let mut variants = vec![raw.to_string()];

    if let Some(idx) = find_season_clause(raw) {
        let truncated = raw[..idx].trim().to_string();
        if !truncated.is_empty() && !variants.contains(&truncated) {
            variants.push(truncated);
        }
    }

    let normalised = normalise_season(raw);
    if !variants.contains(&normalised) {
        variants.push(normalised);
    }

    variants
}

fn find_season_clause(raw: &str) -> Option<usize> {
    let lower = raw.to_lowercase();
    let mut earliest: Option<usize> = None;

    for marker in ["season", "cour", "part"] {
        if let Some(idx) = lower.find(marker) {
            earliest = Some(earliest.map_or(idx, |e| e.min(idx)));
        }
    }

    // sN form, e.g. "Title S2"
    let bytes = lower.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i - 1] == b's' && bytes[i].is_ascii_digit() && (i < 2 || bytes[i - 2] == b' ') {
            earliest = Some(earliest.map_or(i - 1, |e| e.min(i - 1)));
            break;
        }
    }

    earliest
}

fn best_variant_score(query: &str, candidate: &MalCandidate) -> f64 {
    let query_norm = normalise_season(query);
    candidate
        .title_variants()
        .into_iter()
        .map(|variant| similarity(&query_norm, &normalise_season(variant)))
        .fold(0.0, f64::max)
}

fn prefix_relation(query: &str, candidate: &MalCandidate) -> bool {
    if query.len() < 5 {
        return false;
    }
    let query_slug = crate::modules::title::canonical_slug(query);
    candidate.title_variants().into_iter().any(|variant| {
        let variant_slug = crate::modules::title::canonical_slug(variant);
        (query_slug.starts_with(&variant_slug) || variant_slug.starts_with(&query_slug))
            && !query_slug.is_empty()
            && !variant_slug.is_empty()
    })
}

fn year_matches(candidate: &MalCandidate, scraped_year: Option<i32>) -> bool {
    match (candidate.year, scraped_year) {
        (Some(a), Some(b)) => (a - b).abs() <= 1,
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct JikanSearchResponse {
    data: Vec<JikanAnime>,
}

#[derive(Debug, Deserialize)]
struct JikanSingleResponse {
    data: JikanAnime,
}

#[derive(Debug, Deserialize)]
struct JikanAnime {
    mal_id: i32,
    title: String,
    title_english: Option<String>,
    title_japanese: Option<String>,
    #[serde(default)]
    episodes: Option<i32>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    synopsis: Option<String>,
    #[serde(rename = "type", default)]
    anime_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    rank: Option<i32>,
    #[serde(default)]
    season: Option<String>,
    #[serde(default)]
    genres: Vec<JikanNamed>,
    #[serde(default)]
    studios: Vec<JikanNamed>,
    #[serde(default)]
    images: Option<JikanImages>,
}

#[derive(Debug, Deserialize)]
struct JikanNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JikanImages {
    jpg: Option<JikanImageUrls>,
}

#[derive(Debug, Deserialize)]
struct JikanImageUrls {
    image_url: Option<String>,
    large_image_url: Option<String>,
}

impl JikanAnime {
    fn into_candidate(self) -> MalCandidate {
        MalCandidate {
            mal_id: self.mal_id,
            title: self.title,
            title_english: self.title_english,
            title_japanese: self.title_japanese,
            year: self.year,
            total_episodes: self.episodes,
            image_url: self
                .images
                .as_ref()
                .and_then(|i| i.jpg.as_ref())
                .and_then(|j| j.image_url.clone()),
        }
    }

    fn into_full(self) -> MalFull {
        let image_url = self
            .images
            .as_ref()
            .and_then(|i| i.jpg.as_ref())
            .and_then(|j| j.image_url.clone());
        let large_image_url = self
            .images
            .as_ref()
            .and_then(|i| i.jpg.as_ref())
            .and_then(|j| j.large_image_url.clone());

        MalFull {
            mal_id: self.mal_id,
            title: self.title,
            title_english: self.title_english,
            title_japanese: self.title_japanese,
            synopsis: self.synopsis,
            anime_type: self.anime_type,
            total_episodes: self.episodes,
            status: self.status,
            duration: self.duration,
            score: self.score,
            rank: self.rank,
            year: self.year,
            season: self.season,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            studios: self.studios.into_iter().map(|s| s.name).collect(),
            image_url,
            large_image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(mal_id: i32, title: &str, year: Option<i32>) -> MalCandidate {
        MalCandidate {
            mal_id,
            title: title.to_string(),
            title_english: None,
            title_japanese: None,
            year,
            total_episodes: None,
            image_url: None,
        }
    }

    #[test]
    fn validate_metadata_passes_when_fields_unknown() {
        let c = candidate(1, "Test", None);
        assert!(MalClient::validate_metadata(&c, MetadataGate::default(), 2));
    }

    #[test]
    fn validate_metadata_rejects_year_mismatch() {
        let c = candidate(1, "Test", Some(2020));
        let gate = MetadataGate {
            year: Some(2023),
            total_episodes: None,
        };
        assert!(!MalClient::validate_metadata(&c, gate, 2));
    }

    #[test]
    fn validate_metadata_respects_episode_tolerance() {
        let c = candidate(1, "Test", None);
        let mut c = c;
        c.total_episodes = Some(12);
        let gate = MetadataGate {
            year: None,
            total_episodes: Some(14),
        };
        assert!(MalClient::validate_metadata(&c, gate, 2));
        assert!(!MalClient::validate_metadata(&c, gate, 1));
    }

    #[test]
    fn build_query_variants_truncates_season_clause() {
        let variants = build_query_variants("Jigokuraku Season 2");
        assert!(variants.iter().any(|v| v == "Jigokuraku"));
    }
}
