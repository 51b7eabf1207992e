use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identity record for one anime, keyed by `mal_id`. Per-provider slugs are
/// carried as named optional fields rather than a map so field-wise coalesce
/// stays a plain `COALESCE(excluded.col, col)` per column (§4.4).
#[derive(Debug, Clone, Serialize)]
pub struct Mapping {
    pub mal_id: i32,
    pub title_main: String,
    pub slug_animasu: Option<String>,
    pub slug_samehadaku: Option<String>,
    pub slug_otakudesu: Option<String>,
    pub phash_v1: Option<String>,
    pub release_year: Option<i32>,
    pub total_episodes: Option<i32>,
    pub last_sync: DateTime<Utc>,
}

impl Mapping {
    pub fn slug_for(&self, provider: &str) -> Option<&str> {
        match provider.to_lowercase().as_str() {
            "animasu" => self.slug_animasu.as_deref(),
            "samehadaku" => self.slug_samehadaku.as_deref(),
            "otakudesu" => self.slug_otakudesu.as_deref(),
            _ => None,
        }
    }

    pub fn known_providers(&self) -> Vec<&str> {
        let mut known = Vec::new();
        if self.slug_animasu.is_some() {
            known.push("animasu");
        }
        if self.slug_samehadaku.is_some() {
            known.push("samehadaku");
        }
        if self.slug_otakudesu.is_some() {
            known.push("otakudesu");
        }
        known
    }
}

/// A partial mapping write: every field is optional so a caller can express
/// "I only discovered this provider's slug" without clobbering the rest.
#[derive(Debug, Clone, Default)]
pub struct MappingUpsert {
    pub mal_id: i32,
    pub title_main: Option<String>,
    pub slug_animasu: Option<String>,
    pub slug_samehadaku: Option<String>,
    pub slug_otakudesu: Option<String>,
    pub phash_v1: Option<String>,
    pub release_year: Option<i32>,
    pub total_episodes: Option<i32>,
}

impl MappingUpsert {
    pub fn new(mal_id: i32) -> Self {
        Self {
            mal_id,
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, provider: &str, slug: impl Into<String>) -> Self {
        match provider.to_lowercase().as_str() {
            "animasu" => self.slug_animasu = Some(slug.into()),
            "samehadaku" => self.slug_samehadaku = Some(slug.into()),
            "otakudesu" => self.slug_otakudesu = Some(slug.into()),
            _ => {}
        }
        self
    }
}

/// Rich per-`mal_id` MAL metadata, authoritative: conflicting writes
/// overwrite rather than coalesce.
#[derive(Debug, Clone, Serialize)]
pub struct MalMetadataRow {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_for_reads_the_right_column() {
        let m = Mapping {
            mal_id: 1,
            title_main: "Test".into(),
            slug_animasu: Some("test-a".into()),
            slug_samehadaku: None,
            slug_otakudesu: None,
            phash_v1: None,
            release_year: None,
            total_episodes: None,
            last_sync: Utc::now(),
        };
        assert_eq!(m.slug_for("animasu"), Some("test-a"));
        assert_eq!(m.slug_for("samehadaku"), None);
        assert_eq!(m.known_providers(), vec!["animasu"]);
    }
}
