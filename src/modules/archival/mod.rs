mod domain;
mod download;
mod file_key;
mod models;
mod repository;
mod storage;
mod worker;

pub use domain::{QueueCounts, QueueEntry, QueueStatus, StoreEntry, StoreUpsert};
pub use file_key::file_key;
pub use repository::ArchivalRepository;
pub use storage::{HttpStorageTarget, StorageTarget, UploadResult};
pub use worker::ArchivalWorker;
