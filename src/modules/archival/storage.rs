use async_trait::async_trait;

use crate::shared::errors::AppResult;

/// One durable-storage account. The worker uploads to every configured
/// target for redundancy; the first success becomes the primary record.
/// This crate's `StorageTarget` stands in for "an S3-compatible bucket" —
/// the concrete durable store is an external collaborator per §1.
#[async_trait]
pub trait StorageTarget: Send + Sync {
    fn repo_id(&self) -> &str;

    async fn upload(&self, object_key: &str, bytes: &[u8]) -> AppResult<UploadResult>;
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub direct_url: String,
}

/// Reqwest-multipart based target talking to a generic object-storage HTTP
/// endpoint (`POST <base_url>/<object_key>`). One instance per configured
/// `STORAGE_TARGETS` entry.
pub struct HttpStorageTarget {
    repo_id: String,
    base_url: String,
    http: reqwest::Client,
}

impl HttpStorageTarget {
    pub fn new(repo_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("failed to build storage http client"),
        }
    }
}

#[async_trait]
impl StorageTarget for HttpStorageTarget {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    async fn upload(&self, object_key: &str, bytes: &[u8]) -> AppResult<UploadResult> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), object_key);

        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(object_key.to_string())
            .mime_str("video/mp4")
            .map_err(|e| crate::shared::errors::AppError::ExternalServiceError(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(crate::shared::errors::AppError::from)?;

        if !resp.status().is_success() {
            return Err(crate::shared::errors::AppError::ExternalServiceError(format!(
                "upload to {} failed with status {}",
                self.repo_id,
                resp.status()
            )));
        }

        Ok(UploadResult { direct_url: url })
    }
}
