use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::log_warn;
use crate::modules::streaming::types::{EpisodeEntry, ScrapedDetail, SearchCard, StreamingServer};

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(BROWSER_UA)
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build provider http client")
});

/// The three providers this crate knows how to scrape. Every provider here
/// runs the same WordPress anime-theme layout family, so one set of
/// selectors covers all three — only base URL and CDN host family differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Animasu,
    Samehadaku,
    Otakudesu,
}

impl Site {
    pub fn by_name(provider: &str) -> Option<Self> {
        match provider.to_lowercase().as_str() {
            "animasu" => Some(Site::Animasu),
            "samehadaku" => Some(Site::Samehadaku),
            "otakudesu" => Some(Site::Otakudesu),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Site::Animasu => "animasu",
            Site::Samehadaku => "samehadaku",
            Site::Otakudesu => "otakudesu",
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            Site::Animasu => "https://animasu.cafe",
            Site::Samehadaku => "https://samehadaku.email",
            Site::Otakudesu => "https://otakudesu.cam",
        }
    }

    /// Hostname fragments that count as "this provider's own domain or its
    /// known CDN family" for cover-URL validation (§4.6 step 2, §4.6.1
    /// steps 1 and 4).
    fn cdn_fragments(&self) -> &'static [&'static str] {
        match self {
            Site::Animasu => &["animasu.cafe", "animasu-cdn"],
            Site::Samehadaku => &["samehadaku.email", "samehadaku-cdn"],
            Site::Otakudesu => &["otakudesu.cam", "otakudesu-cdn"],
        }
    }

    pub fn cover_host_is_valid(&self, cover_url: &str) -> bool {
        match url::Url::parse(cover_url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => self.cdn_fragments().iter().any(|f| host.contains(f)),
            None => false,
        }
    }

    /// §4.6.1 step 1: some providers return small, specific result sets
    /// with reliably full card titles, so card-title pre-filtering can be
    /// skipped once the result count is small. Samehadaku's theme is the
    /// one in this system that returns romaji full titles.
    pub fn skips_title_prefilter(&self, result_count: usize) -> bool {
        *self == Site::Samehadaku && result_count <= 3
    }

    fn detail_url(&self, slug: &str) -> String {
        format!("{}/anime/{}", self.base_url(), slug)
    }

    fn episode_url(&self, slug: &str, episode: i32) -> String {
        format!("{}/{}-episode-{}", self.base_url(), slug, episode)
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/?s={}", self.base_url(), urlencoding::encode(query))
    }
}

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("div.listupd article.bs").unwrap());
static CARD_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static CARD_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".tt, h2").unwrap());
static CARD_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

static DETAIL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1.entry-title, .infox h1").unwrap());
static DETAIL_COVER: Lazy<Selector> = Lazy::new(|| Selector::parse(".thumb img, .infoanime img").unwrap());
static DETAIL_INFO_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse(".infox .spe span, .info-content span").unwrap());

static SERVER_OPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".mirrorstream ul li a, select.mirror option").unwrap());

static EPISODE_ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".episodelist ul li a, .eplister ul li a").unwrap());

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").unwrap());
static EPISODES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*episode").unwrap());
static EPISODE_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)episode[-_](\d+)").unwrap());

/// WordPress-style search: extract `{slug, cover_url, card_title}` cards
/// from the theme's result-grid markup (§4.6.1 step 1).
pub async fn search(site: Site, query: &str) -> Vec<SearchCard> {
    let body = match fetch(&site.search_url(query)).await {
        Some(b) => b,
        None => return Vec::new(),
    };

    let doc = Html::parse_document(&body);
    doc.select(&CARD)
        .filter_map(|card| {
            let link = card.select(&CARD_LINK).next()?;
            let href = link.value().attr("href")?;
            let slug = slug_from_url(href)?;
            let card_title = card
                .select(&CARD_TITLE)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            let cover_url = card
                .select(&CARD_IMG)
                .next()
                .and_then(|img| img.value().attr("data-src").or_else(|| img.value().attr("src")))
                .map(str::to_string);

            Some(SearchCard { slug, cover_url, card_title })
        })
        .collect()
}

/// Series-level detail page (§4.6 step 1, §4.6.1 step 4).
pub async fn detail(site: Site, slug: &str) -> Option<ScrapedDetail> {
    let body = fetch(&site.detail_url(slug)).await?;
    let doc = Html::parse_document(&body);

    let title = doc
        .select(&DETAIL_TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    let cover_url = doc
        .select(&DETAIL_COVER)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    let mut release_year = None;
    let mut total_episodes = None;
    for row in doc.select(&DETAIL_INFO_ROW) {
        let text = row.text().collect::<String>();
        if release_year.is_none() {
            if let Some(m) = YEAR_RE.find(&text) {
                release_year = m.as_str().parse().ok();
            }
        }
        if total_episodes.is_none() {
            if let Some(c) = EPISODES_RE.captures(&text) {
                total_episodes = c.get(1).and_then(|m| m.as_str().parse().ok());
            }
        }
    }

    if title.is_empty() {
        return None;
    }

    Some(ScrapedDetail { title, cover_url, release_year, total_episodes })
}

/// The series detail page's episode list, for `/api/v1/anime/:slug` (§6).
pub async fn episode_list(site: Site, slug: &str) -> Vec<EpisodeEntry> {
    let body = match fetch(&site.detail_url(slug)).await {
        Some(b) => b,
        None => return Vec::new(),
    };

    let doc = Html::parse_document(&body);
    let mut entries: Vec<EpisodeEntry> = doc
        .select(&EPISODE_ITEM)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let episode: i32 = EPISODE_NUM_RE.captures(href)?.get(1)?.as_str().parse().ok()?;
            let title = el.text().collect::<String>().trim().to_string();
            let title = if title.is_empty() { None } else { Some(title) };
            Some(EpisodeEntry { episode, title })
        })
        .collect();

    entries.sort_by_key(|e| e.episode);
    entries.dedup_by_key(|e| e.episode);
    entries
}

/// Episode page's list of mirrors/servers, each a candidate embed URL
/// (§4.7).
pub async fn episode_servers(site: Site, slug: &str, episode: i32) -> Vec<StreamingServer> {
    let body = match fetch(&site.episode_url(slug, episode)).await {
        Some(b) => b,
        None => return Vec::new(),
    };

    let doc = Html::parse_document(&body);
    doc.select(&SERVER_OPTION)
        .filter_map(|el| {
            let raw = el
                .value()
                .attr("data-content")
                .or_else(|| el.value().attr("value"))
                .or_else(|| el.value().attr("href"))?;
            let embed_url = decode_iframe_payload(raw)?;
            let resolution = el
                .text()
                .collect::<String>()
                .split_whitespace()
                .find(|tok| tok.ends_with('p') && tok[..tok.len() - 1].chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string);

            Some(StreamingServer {
                provider: site.name().to_string(),
                embed_url,
                resolution,
                resolved_url: None,
                stream_url: None,
            })
        })
        .collect()
}

/// Some mirrors embed the iframe markup directly in the option's
/// `data-content` attribute instead of linking the embed URL; pull the
/// `src` out of it either way.
fn decode_iframe_payload(raw: &str) -> Option<String> {
    if raw.starts_with("http") {
        return Some(raw.to_string());
    }
    let fragment = Html::parse_fragment(raw);
    let iframe = Selector::parse("iframe").ok()?;
    fragment.select(&iframe).next()?.value().attr("src").map(str::to_string)
}

fn slug_from_url(href: &str) -> Option<String> {
    url::Url::parse(href)
        .ok()?
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

async fn fetch(url: &str) -> Option<String> {
    let resp = match HTTP.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            log_warn!("streaming: fetch failed for {}: {}", url, e);
            return None;
        }
    };
    if !resp.status().is_success() {
        log_warn!("streaming: fetch {} returned status {}", url, resp.status());
        return None;
    }
    resp.text().await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_host_is_valid_accepts_own_domain_and_rejects_others() {
        assert!(Site::Animasu.cover_host_is_valid("https://animasu.cafe/covers/x.jpg"));
        assert!(!Site::Animasu.cover_host_is_valid("https://evil.example/covers/x.jpg"));
    }

    #[test]
    fn slug_from_url_takes_the_last_path_segment() {
        assert_eq!(
            slug_from_url("https://samehadaku.email/anime/jigokuraku-season-2/"),
            Some("jigokuraku-season-2".to_string())
        );
    }

    #[test]
    fn skips_title_prefilter_only_for_samehadaku_with_few_results() {
        assert!(Site::Samehadaku.skips_title_prefilter(2));
        assert!(!Site::Samehadaku.skips_title_prefilter(5));
        assert!(!Site::Animasu.skips_title_prefilter(1));
    }

    #[test]
    fn episode_num_regex_reads_trailing_episode_number() {
        let href = "https://samehadaku.email/jigokuraku-season-2-episode-7/";
        let num: i32 = EPISODE_NUM_RE.captures(href).unwrap().get(1).unwrap().as_str().parse().unwrap();
        assert_eq!(num, 7);
    }
}
