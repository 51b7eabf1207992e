use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::modules::archival::domain::{QueueEntry, QueueStatus, StoreEntry};
use crate::schema::{queue_entries, store_entries};

fn opt_resolution(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[derive(Debug, Clone, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = queue_entries)]
pub struct QueueEntryModel {
    pub id: Uuid,
    pub mal_id: i32,
    pub episode: i32,
    pub provider: String,
    pub video_url: String,
    pub resolution: String,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QueueEntryModel> for QueueEntry {
    fn from(m: QueueEntryModel) -> Self {
        QueueEntry {
            id: m.id,
            mal_id: m.mal_id,
            episode: m.episode,
            provider: m.provider,
            video_url: m.video_url,
            resolution: opt_resolution(&m.resolution),
            status: m.status,
            retry_count: m.retry_count,
            error_message: m.error_message,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = store_entries)]
pub struct StoreEntryModel {
    pub id: Uuid,
    pub mal_id: i32,
    pub episode: i32,
    pub provider: String,
    pub resolution: String,
    pub file_key: String,
    pub account_index: i32,
    pub repo_id: String,
    pub path: String,
    pub direct_url: String,
    pub stream_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoreEntryModel> for StoreEntry {
    fn from(m: StoreEntryModel) -> Self {
        StoreEntry {
            id: m.id,
            mal_id: m.mal_id,
            episode: m.episode,
            provider: m.provider,
            resolution: opt_resolution(&m.resolution),
            file_key: m.file_key,
            account_index: m.account_index,
            repo_id: m.repo_id,
            path: m.path,
            direct_url: m.direct_url,
            stream_url: m.stream_url,
            created_at: m.created_at,
        }
    }
}
