use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Jsonb, Nullable, Text};
use tokio::task;

use crate::log_debug;
use crate::modules::hash::hamming;
use crate::modules::mapping::domain::{MalMetadataRow, Mapping, MappingUpsert};
use crate::modules::mapping::models::{MalMetadataModel, MappingModel, NewMalMetadata};
use crate::schema::{mal_metadata, mappings};
use crate::shared::database::Database;
use crate::shared::errors::AppResult;

/// A thin listing projection for the home/search routes (§6): just enough
/// to render a card, not a full `Mapping`/`MalMetadataRow` pair.
#[derive(Debug, Clone, QueryableByName)]
pub struct ListingRow {
    #[diesel(sql_type = Integer)]
    pub mal_id: i32,
    #[diesel(sql_type = Text)]
    pub title_main: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub cover: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub slug_animasu: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub slug_samehadaku: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub slug_otakudesu: Option<String>,
}

/// Field-wise coalescing persistence for mappings and their MAL metadata.
/// Owned by the mapping resolver (C6); never deletes rows.
pub struct MappingRepository {
    db: Arc<Database>,
}

impl MappingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// `ON CONFLICT (mal_id) DO UPDATE SET col = COALESCE(excluded.col, mappings.col)`:
    /// a supplied non-null field overwrites, a null preserves what's already
    /// stored. `last_sync` always advances.
    pub async fn upsert(&self, upsert: MappingUpsert) -> AppResult<Mapping> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> AppResult<Mapping> {
            let mut conn = db.get_connection()?;

            let model = diesel::sql_query(
                r#"
                INSERT INTO mappings (mal_id, title_main, slug_animasu, slug_samehadaku, slug_otakudesu, phash_v1, release_year, total_episodes, last_sync)
                VALUES ($1, COALESCE($2, ''), $3, $4, $5, $6, $7, $8, now())
                ON CONFLICT (mal_id) DO UPDATE SET
                    title_main = COALESCE(excluded.title_main, mappings.title_main),
                    slug_animasu = COALESCE(excluded.slug_animasu, mappings.slug_animasu),
                    slug_samehadaku = COALESCE(excluded.slug_samehadaku, mappings.slug_samehadaku),
                    slug_otakudesu = COALESCE(excluded.slug_otakudesu, mappings.slug_otakudesu),
                    phash_v1 = COALESCE(excluded.phash_v1, mappings.phash_v1),
                    release_year = COALESCE(excluded.release_year, mappings.release_year),
                    total_episodes = COALESCE(excluded.total_episodes, mappings.total_episodes),
                    last_sync = now()
                RETURNING mal_id, title_main, slug_animasu, slug_samehadaku, slug_otakudesu, phash_v1, release_year, total_episodes, last_sync
                "#,
            )
            .bind::<Integer, _>(upsert.mal_id)
            .bind::<Nullable<Text>, _>(upsert.title_main)
            .bind::<Nullable<Text>, _>(upsert.slug_animasu)
            .bind::<Nullable<Text>, _>(upsert.slug_samehadaku)
            .bind::<Nullable<Text>, _>(upsert.slug_otakudesu)
            .bind::<Nullable<Text>, _>(upsert.phash_v1)
            .bind::<Nullable<Integer>, _>(upsert.release_year)
            .bind::<Nullable<Integer>, _>(upsert.total_episodes)
            .get_result::<MappingModel>(&mut conn)?;

            Ok(model.into())
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }

    pub async fn find_by_mal_id(&self, mal_id: i32) -> AppResult<Option<Mapping>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> AppResult<Option<Mapping>> {
            let mut conn = db.get_connection()?;
            let result = mappings::table
                .filter(mappings::mal_id.eq(mal_id))
                .select(MappingModel::as_select())
                .first::<MappingModel>(&mut conn)
                .optional()?;
            Ok(result.map(Into::into))
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }

    pub async fn find_by_slug(&self, provider: &str, slug: &str) -> AppResult<Option<Mapping>> {
        let db = Arc::clone(&self.db);
        let provider = provider.to_lowercase();
        let slug = slug.to_string();

        task::spawn_blocking(move || -> AppResult<Option<Mapping>> {
            let mut conn = db.get_connection()?;

            let result = match provider.as_str() {
                "animasu" => mappings::table
                    .filter(mappings::slug_animasu.eq(&slug))
                    .select(MappingModel::as_select())
                    .first::<MappingModel>(&mut conn)
                    .optional()?,
                "samehadaku" => mappings::table
                    .filter(mappings::slug_samehadaku.eq(&slug))
                    .select(MappingModel::as_select())
                    .first::<MappingModel>(&mut conn)
                    .optional()?,
                "otakudesu" => mappings::table
                    .filter(mappings::slug_otakudesu.eq(&slug))
                    .select(MappingModel::as_select())
                    .first::<MappingModel>(&mut conn)
                    .optional()?,
                _ => None,
            };

            Ok(result.map(Into::into))
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }

    /// Nearest-pHash lookup within `threshold`. Always re-verifies the
    /// distance on the caller side so a stale query plan never surfaces a
    /// false positive; returns `None` rather than erroring when the
    /// underlying function is unavailable.
    pub async fn find_nearest_phash(
        &self,
        hash: &str,
        threshold: u32,
    ) -> AppResult<Option<Mapping>> {
        let db = Arc::clone(&self.db);
        let query_hash = hash.to_string();
        let bind_hash = query_hash.clone();

        let result = task::spawn_blocking(move || -> AppResult<Option<MappingModel>> {
            let mut conn = db.get_connection()?;

            let rows = diesel::sql_query(
                r#"
                SELECT mal_id, title_main, slug_animasu, slug_samehadaku, slug_otakudesu, phash_v1, release_year, total_episodes, last_sync
                FROM mappings
                WHERE phash_v1 IS NOT NULL AND phash_hamming(phash_v1, $1) < $2
                ORDER BY phash_hamming(phash_v1, $1) ASC
                LIMIT 1
                "#,
            )
            .bind::<Text, _>(bind_hash)
            .bind::<Integer, _>(threshold as i32)
            .load::<MappingModel>(&mut conn);

            match rows {
                Ok(mut rows) => Ok(rows.pop()),
                Err(e) => {
                    log_debug!("find_nearest_phash: query unavailable, falling through: {}", e);
                    Ok(None)
                }
            }
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))??;

        // Re-verify server-side distance client-side: guards against a stale
        // query plan surfacing a row that no longer satisfies the threshold.
        Ok(result.and_then(|model| {
            let mapping: Mapping = model.into();
            let verified = mapping
                .phash_v1
                .as_deref()
                .map(|stored| {
                    let distance = hamming(stored, &query_hash);
                    distance >= 0 && (distance as u32) < threshold
                })
                .unwrap_or(false);
            verified.then_some(mapping)
        }))
    }

    pub async fn get_mal_metadata(&self, mal_id: i32) -> AppResult<Option<MalMetadataRow>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> AppResult<Option<MalMetadataRow>> {
            let mut conn = db.get_connection()?;
            let result = mal_metadata::table
                .filter(mal_metadata::mal_id.eq(mal_id))
                .select(MalMetadataModel::as_select())
                .first::<MalMetadataModel>(&mut conn)
                .optional()?;
            Ok(result.map(Into::into))
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }

    /// MAL metadata is authoritative: a fresh fetch always overwrites.
    pub async fn upsert_mal_metadata(&self, row: MalMetadataRow) -> AppResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> AppResult<()> {
            let mut conn = db.get_connection()?;

            let new_row = NewMalMetadata {
                mal_id: row.mal_id,
                title: row.title,
                title_english: row.title_english,
                title_japanese: row.title_japanese,
                synopsis: row.synopsis,
                anime_type: row.anime_type,
                total_episodes: row.total_episodes,
                status: row.status,
                duration: row.duration,
                score: row.score,
                rank: row.rank,
                year: row.year,
                season: row.season,
                genres: serde_json::to_value(row.genres).unwrap_or_default(),
                studios: serde_json::to_value(row.studios).unwrap_or_default(),
                image_url: row.image_url,
                large_image_url: row.large_image_url,
                updated_at: Utc::now(),
            };

            diesel::insert_into(mal_metadata::table)
                .values(&new_row)
                .on_conflict(mal_metadata::mal_id)
                .do_update()
                .set(&new_row)
                .execute(&mut conn)?;

            Ok(())
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }

    /// Most recently synced mappings, for `/api/v1/home` (§6). Stands in
    /// for the out-of-scope cross-provider dedup aggregator: this crate's
    /// own store is already deduplicated by `mal_id`, so "recent" is a
    /// reasonable proxy for "currently relevant" without a live scrape.
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<ListingRow>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> AppResult<Vec<ListingRow>> {
            let mut conn = db.get_connection()?;
            let rows = diesel::sql_query(
                r#"
                SELECT m.mal_id, m.title_main,
                       COALESCE(md.large_image_url, md.image_url) AS cover,
                       m.slug_animasu, m.slug_samehadaku, m.slug_otakudesu
                FROM mappings m
                LEFT JOIN mal_metadata md ON md.mal_id = m.mal_id
                ORDER BY m.last_sync DESC
                LIMIT $1
                "#,
            )
            .bind::<BigInt, _>(limit)
            .load::<ListingRow>(&mut conn)?;
            Ok(rows)
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }

    /// Genre-filtered listing for `/api/v1/search` (§6), one page past the
    /// end so the caller can compute `has_next_page` without a second
    /// count query.
    pub async fn search_by_genre(
        &self,
        genre_name: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<ListingRow>> {
        let db = Arc::clone(&self.db);
        let genre_json = serde_json::json!([genre_name]);

        task::spawn_blocking(move || -> AppResult<Vec<ListingRow>> {
            let mut conn = db.get_connection()?;
            let rows = diesel::sql_query(
                r#"
                SELECT m.mal_id, m.title_main,
                       COALESCE(md.large_image_url, md.image_url) AS cover,
                       m.slug_animasu, m.slug_samehadaku, m.slug_otakudesu
                FROM mappings m
                INNER JOIN mal_metadata md ON md.mal_id = m.mal_id
                WHERE md.genres @> $1
                ORDER BY md.score DESC NULLS LAST, m.mal_id ASC
                OFFSET $2 LIMIT $3
                "#,
            )
            .bind::<Jsonb, _>(genre_json)
            .bind::<BigInt, _>(offset)
            .bind::<BigInt, _>(limit)
            .load::<ListingRow>(&mut conn)?;
            Ok(rows)
        })
        .await
        .map_err(|e| crate::shared::errors::AppError::InternalError(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_upsert_builder_sets_requested_slug() {
        let upsert = MappingUpsert::new(1).with_slug("animasu", "test-slug");
        assert_eq!(upsert.slug_animasu.as_deref(), Some("test-slug"));
        assert_eq!(upsert.slug_samehadaku, None);
    }
}
