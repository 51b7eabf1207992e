use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value as Json;

use crate::modules::mapping::domain::{Mapping, MalMetadataRow};
use crate::schema::{mal_metadata, mappings};

#[derive(Debug, Clone, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = mappings)]
pub struct MappingModel {
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

impl From<MappingModel> for Mapping {
    fn from(m: MappingModel) -> Self {
        Mapping {
            mal_id: m.mal_id,
            title_main: m.title_main,
            slug_animasu: m.slug_animasu,
            slug_samehadaku: m.slug_samehadaku,
            slug_otakudesu: m.slug_otakudesu,
            phash_v1: m.phash_v1,
            release_year: m.release_year,
            total_episodes: m.total_episodes,
            last_sync: m.last_sync,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = mappings)]
pub struct NewMapping {
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

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mal_metadata)]
pub struct MalMetadataModel {
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
    pub genres: Json,
    pub studios: Json,
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<MalMetadataModel> for MalMetadataRow {
    fn from(m: MalMetadataModel) -> Self {
        let genres: Vec<String> = serde_json::from_value(m.genres).unwrap_or_default();
        let studios: Vec<String> = serde_json::from_value(m.studios).unwrap_or_default();
        MalMetadataRow {
            mal_id: m.mal_id,
            title: m.title,
            title_english: m.title_english,
            title_japanese: m.title_japanese,
            synopsis: m.synopsis,
            anime_type: m.anime_type,
            total_episodes: m.total_episodes,
            status: m.status,
            duration: m.duration,
            score: m.score,
            rank: m.rank,
            year: m.year,
            season: m.season,
            genres,
            studios,
            image_url: m.image_url,
            large_image_url: m.large_image_url,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = mal_metadata)]
pub struct NewMalMetadata {
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
    pub genres: Json,
    pub studios: Json,
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
