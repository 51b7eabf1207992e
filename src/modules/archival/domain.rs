use chrono::{DateTime, Utc};
use diesel_derive_enum::DbEnum;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum, Serialize)]
#[ExistingTypePath = "crate::schema::sql_types::QueueStatus"]
pub enum QueueStatus {
    Pending,
    Downloading,
    Uploading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub mal_id: i32,
    pub episode: i32,
    pub provider: String,
    pub video_url: String,
    pub resolution: Option<String>,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreEntry {
    pub id: Uuid,
    pub mal_id: i32,
    pub episode: i32,
    pub provider: String,
    pub resolution: Option<String>,
    pub file_key: String,
    pub account_index: i32,
    pub repo_id: String,
    pub path: String,
    pub direct_url: String,
    pub stream_url: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the archival worker needs to commit a successful upload.
#[derive(Debug, Clone)]
pub struct StoreUpsert {
    pub mal_id: i32,
    pub episode: i32,
    pub provider: String,
    pub resolution: Option<String>,
    pub file_key: String,
    pub account_index: i32,
    pub repo_id: String,
    pub path: String,
    pub direct_url: String,
    pub stream_url: String,
}

/// Queue counters by status plus the archived-entry count, for the
/// worker's `GET /status` (§6).
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub downloading: i64,
    pub uploading: i64,
    pub ready: i64,
    pub failed: i64,
    pub archived: i64,
}

/// The empty-string sentinel used on the `resolution` columns so a plain
/// UNIQUE constraint gives the "null is distinct" semantics spec wants
/// without needing a partial index (§3, §4.8 implementation note).
pub fn resolution_key(resolution: &Option<String>) -> String {
    resolution.clone().unwrap_or_default()
}
