use serde::Serialize;

/// One candidate returned from a provider's WordPress-style search page
/// (§4.6.1 step 1).
#[derive(Debug, Clone)]
pub struct SearchCard {
    pub slug: String,
    pub cover_url: Option<String>,
    pub card_title: String,
}

/// What a provider's episode/detail page reveals about the series itself,
/// independent of any one episode (§4.6 step 1, §4.6.1 step 4).
#[derive(Debug, Clone, Default)]
pub struct ScrapedDetail {
    pub title: String,
    pub cover_url: Option<String>,
    pub release_year: Option<i32>,
    pub total_episodes: Option<i32>,
}

/// One playable server on one provider's episode page, before and after C5
/// resolution and store enrichment (§4.7).
#[derive(Debug, Clone, Serialize)]
pub struct StreamingServer {
    pub provider: String,
    pub embed_url: String,
    pub resolution: Option<String>,
    pub resolved_url: Option<String>,
    pub stream_url: Option<String>,
}

/// One row of a provider's episode list, as shown on the series detail
/// page (§6 `/api/v1/anime/:slug`).
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeEntry {
    pub episode: i32,
    pub title: Option<String>,
}
