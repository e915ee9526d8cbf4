//! Object storage for evidence images
//!
//! [`HttpBlobStore`] talks to a Supabase-compatible storage API: objects are
//! written with the service key and read back through public URLs.

use async_trait::async_trait;
use axum::body::Bytes;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object under `path` and return its public URL
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> AppResult<String>;
}

#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpBlobStore {
    pub fn new(config: &StorageConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
        })
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> AppResult<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            // Paths are unique per attempt; never overwrite
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::UploadFailed(format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UploadFailed(format!(
                "{}: storage answered {} {}",
                path, status, body
            )));
        }

        tracing::debug!("Uploaded {} to bucket {}", path, self.bucket);
        Ok(self.public_url(path))
    }
}
