use serde::{Deserialize, Serialize};

/// A single search/lookup result from MAL, carrying the titles this crate
/// compares against (English, romaji/default, Japanese).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalCandidate {
    pub mal_id: i32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub year: Option<i32>,
    pub total_episodes: Option<i32>,
    pub image_url: Option<String>,
}

impl MalCandidate {
    /// All known title variants, deduplicated, in a stable preference order.
    pub fn title_variants(&self) -> Vec<&str> {
        let mut variants = vec![self.title.as_str()];
        if let Some(t) = self.title_english.as_deref() {
            if !variants.contains(&t) {
                variants.push(t);
            }
        }
        if let Some(t) = self.title_japanese.as_deref() {
            if !variants.contains(&t) {
                variants.push(t);
            }
        }
        variants
    }
}

/// Rich per-`mal_id` record, persisted verbatim by the mapping store's
/// MAL-metadata table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalFull {
    pub mal_id: i32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub synopsis: Option<String>,
    pub anime_type: Option<String>,
    pub total_episodes: Option<i32>,
    pub status: Option<String>,
    pub duration: Option<String>,
    pub score: Option<f64>,
    pub rank: Option<i32>,
    pub year: Option<i32>,
    pub season: Option<String>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
}

impl MalFull {
    pub fn as_candidate(&self) -> MalCandidate {
        MalCandidate {
            mal_id: self.mal_id,
            title: self.title.clone(),
            title_english: self.title_english.clone(),
            title_japanese: self.title_japanese.clone(),
            year: self.year,
            total_episodes: self.total_episodes,
            image_url: self.image_url.clone(),
        }
    }
}

/// The known/unknown metadata a caller wants to gate a candidate against.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataGate {
    pub year: Option<i32>,
    pub total_episodes: Option<i32>,
}
