use std::sync::Arc;

use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use tokio::task;
use uuid::Uuid;

use crate::modules::archival::domain::{resolution_key, QueueCounts, QueueEntry, QueueStatus, StoreEntry, StoreUpsert};
use crate::modules::archival::models::{QueueEntryModel, StoreEntryModel};
use crate::schema::{queue_entries, store_entries};
use crate::shared::database::Database;
use crate::shared::errors::{AppError, AppResult};

pub struct ArchivalRepository {
    db: Arc<Database>,
}

impl ArchivalRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert-or-update on the unique key. `ready` is a no-op; `failed`
    /// resets to `pending` and refreshes `video_url`; any other status
    /// is left alone but `updated_at` still advances (§4.8).
    pub async fn enqueue(
        &self,
        mal_id: i32,
        episode: i32,
        provider: &str,
        video_url: &str,
        resolution: Option<&str>,
    ) -> AppResult<QueueEntry> {
        let db = Arc::clone(&self.db);
        let provider = provider.to_string();
        let video_url = video_url.to_string();
        let resolution = resolution.unwrap_or("").to_string();

        task::spawn_blocking(move || -> AppResult<QueueEntry> {
            let mut conn = db.get_connection()?;

            let model = diesel::sql_query(
                r#"
                INSERT INTO queue_entries (mal_id, episode, provider, video_url, resolution, status)
                VALUES ($1, $2, $3, $4, $5, 'pending')
                ON CONFLICT (mal_id, episode, provider, resolution) DO UPDATE SET
                    video_url = CASE WHEN queue_entries.status = 'failed' THEN excluded.video_url ELSE queue_entries.video_url END,
                    status = CASE WHEN queue_entries.status = 'failed' THEN 'pending'::queue_status ELSE queue_entries.status END,
                    updated_at = CASE WHEN queue_entries.status = 'ready' THEN queue_entries.updated_at ELSE now() END
                RETURNING id, mal_id, episode, provider, video_url, resolution, status, retry_count, error_message, created_at, updated_at
                "#,
            )
            .bind::<Integer, _>(mal_id)
            .bind::<Integer, _>(episode)
            .bind::<Text, _>(provider)
            .bind::<Text, _>(video_url)
            .bind::<Text, _>(resolution)
            .get_result::<QueueEntryModel>(&mut conn)?;

            Ok(model.into())
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    /// Atomic claim of up to `n` `pending` entries via `SELECT ... FOR UPDATE
    /// SKIP LOCKED`, so running multiple worker processes is safe.
    pub async fn claim(&self, n: i64) -> AppResult<Vec<QueueEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> AppResult<Vec<QueueEntry>> {
            let mut conn = db.get_connection()?;

            conn.transaction(|conn| {
                let models = diesel::sql_query(
                    r#"
                    UPDATE queue_entries
                    SET status = 'downloading', updated_at = now()
                    WHERE id IN (
                        SELECT id FROM queue_entries
                        WHERE status = 'pending'
                        ORDER BY created_at ASC
                        FOR UPDATE SKIP LOCKED
                        LIMIT $1
                    )
                    RETURNING id, mal_id, episode, provider, video_url, resolution, status, retry_count, error_message, created_at, updated_at
                    "#,
                )
                .bind::<Integer, _>(n as i32)
                .load::<QueueEntryModel>(conn)?;

                Ok(models.into_iter().map(Into::into).collect())
            })
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: QueueStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        let db = Arc::clone(&self.db);
        let error = error.map(str::to_string);

        task::spawn_blocking(move || -> AppResult<()> {
            let mut conn = db.get_connection()?;

            if status == QueueStatus::Failed {
                diesel::sql_query(
                    r#"
                    UPDATE queue_entries
                    SET status = 'failed', retry_count = retry_count + 1, error_message = $2, updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind::<diesel::sql_types::Uuid, _>(id)
                .bind::<diesel::sql_types::Nullable<Text>, _>(error)
                .execute(&mut conn)?;
            } else {
                diesel::update(queue_entries::table.filter(queue_entries::id.eq(id)))
                    .set((
                        queue_entries::status.eq(status),
                        queue_entries::updated_at.eq(chrono::Utc::now()),
                    ))
                    .execute(&mut conn)?;
            }

            Ok(())
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    /// Insert-or-replace by the store's unique key; in the same transaction
    /// marks the corresponding queue entry `ready`.
    pub async fn upsert_store(&self, payload: StoreUpsert) -> AppResult<StoreEntry> {
        let db = Arc::clone(&self.db);
        let resolution = resolution_key(&payload.resolution);

        task::spawn_blocking(move || -> AppResult<StoreEntry> {
            let mut conn = db.get_connection()?;

            conn.transaction(|conn| {
                let model = diesel::sql_query(
                    r#"
                    INSERT INTO store_entries (mal_id, episode, provider, resolution, file_key, account_index, repo_id, path, direct_url, stream_url)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (mal_id, episode, provider, resolution) DO UPDATE SET
                        file_key = excluded.file_key,
                        account_index = excluded.account_index,
                        repo_id = excluded.repo_id,
                        path = excluded.path,
                        direct_url = excluded.direct_url,
                        stream_url = excluded.stream_url
                    RETURNING id, mal_id, episode, provider, resolution, file_key, account_index, repo_id, path, direct_url, stream_url, created_at
                    "#,
                )
                .bind::<Integer, _>(payload.mal_id)
                .bind::<Integer, _>(payload.episode)
                .bind::<Text, _>(payload.provider.clone())
                .bind::<Text, _>(resolution.clone())
                .bind::<Text, _>(payload.file_key.clone())
                .bind::<Integer, _>(payload.account_index)
                .bind::<Text, _>(payload.repo_id.clone())
                .bind::<Text, _>(payload.path.clone())
                .bind::<Text, _>(payload.direct_url.clone())
                .bind::<Text, _>(payload.stream_url.clone())
                .get_result::<StoreEntryModel>(conn)?;

                diesel::sql_query(
                    r#"
                    UPDATE queue_entries
                    SET status = 'ready', updated_at = now()
                    WHERE mal_id = $1 AND episode = $2 AND provider = $3 AND resolution = $4
                    "#,
                )
                .bind::<Integer, _>(payload.mal_id)
                .bind::<Integer, _>(payload.episode)
                .bind::<Text, _>(payload.provider)
                .bind::<Text, _>(resolution)
                .execute(conn)?;

                Ok(model.into())
            })
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    pub async fn find_store_entry(
        &self,
        mal_id: i32,
        episode: i32,
        provider: &str,
        resolution: Option<&str>,
    ) -> AppResult<Option<StoreEntry>> {
        let db = Arc::clone(&self.db);
        let provider = provider.to_string();
        let resolution = resolution.unwrap_or("").to_string();

        task::spawn_blocking(move || -> AppResult<Option<StoreEntry>> {
            let mut conn = db.get_connection()?;
            let result = store_entries::table
                .filter(store_entries::mal_id.eq(mal_id))
                .filter(store_entries::episode.eq(episode))
                .filter(store_entries::provider.eq(provider))
                .filter(store_entries::resolution.eq(resolution))
                .select(StoreEntryModel::as_select())
                .first::<StoreEntryModel>(&mut conn)
                .optional()?;
            Ok(result.map(Into::into))
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    /// Any in-progress or completed queue entry for the key, used by the
    /// enrichment pipeline to decide whether an enqueue is needed at all.
    pub async fn find_queue_entry(
        &self,
        mal_id: i32,
        episode: i32,
        provider: &str,
        resolution: Option<&str>,
    ) -> AppResult<Option<QueueEntry>> {
        let db = Arc::clone(&self.db);
        let provider = provider.to_string();
        let resolution = resolution.unwrap_or("").to_string();

        task::spawn_blocking(move || -> AppResult<Option<QueueEntry>> {
            let mut conn = db.get_connection()?;
            let result = queue_entries::table
                .filter(queue_entries::mal_id.eq(mal_id))
                .filter(queue_entries::episode.eq(episode))
                .filter(queue_entries::provider.eq(provider))
                .filter(queue_entries::resolution.eq(resolution))
                .select(QueueEntryModel::as_select())
                .first::<QueueEntryModel>(&mut conn)
                .optional()?;
            Ok(result.map(Into::into))
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }

    /// Queue counters by status plus the total archived (`store_entries`)
    /// count, for the worker's `GET /status` (§6).
    pub async fn status_counts(&self) -> AppResult<QueueCounts> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> AppResult<QueueCounts> {
            let mut conn = db.get_connection()?;

            #[derive(QueryableByName)]
            struct CountRow {
                #[diesel(sql_type = Text)]
                status: String,
                #[diesel(sql_type = diesel::sql_types::BigInt)]
                n: i64,
            }

            let rows = diesel::sql_query(
                "SELECT status::text AS status, count(*) AS n FROM queue_entries GROUP BY status",
            )
            .load::<CountRow>(&mut conn)?;

            let mut counts = QueueCounts::default();
            for row in rows {
                match row.status.as_str() {
                    "pending" => counts.pending = row.n,
                    "downloading" => counts.downloading = row.n,
                    "uploading" => counts.uploading = row.n,
                    "ready" => counts.ready = row.n,
                    "failed" => counts.failed = row.n,
                    _ => {}
                }
            }

            counts.archived = store_entries::table
                .count()
                .get_result::<i64>(&mut conn)
                .unwrap_or(0);

            Ok(counts)
        })
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    }
}
