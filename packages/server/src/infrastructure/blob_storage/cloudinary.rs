//! Cloudinary を使った BlobStorage 実装
//!
//! - アップロード: 署名付きの Upload API（`POST {base}/{cloud}/image/upload`）
//! - 一括削除: Admin API（`DELETE {base}/{cloud}/resources/image/upload?public_ids[]=...`）

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tsudoi_shared::time::get_utc_timestamp;

use crate::domain::{BlobStorage, ImageUrl, StorageError, StorageHandle, StoredImage};

pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// Cloudinary の認証情報
#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryBlobStorage {
    client: reqwest::Client,
    credentials: CloudinaryCredentials,
    base_url: String,
}

impl CloudinaryBlobStorage {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: DEFAULT_CLOUDINARY_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn upload_endpoint(&self) -> String {
        format!("{}/{}/image/upload", self.base_url, self.credentials.cloud_name)
    }

    fn resources_endpoint(&self) -> String {
        format!(
            "{}/{}/resources/image/upload",
            self.base_url, self.credentials.cloud_name
        )
    }
}

/// アップロードの署名（SHA-256, hex）
///
/// 署名対象は `file` / `api_key` / `signature_algorithm` 以外のパラメータ（ここでは `timestamp` のみ）。
pub fn sign_upload(timestamp: i64, api_secret: &str) -> String {
    let digest = Sha256::digest(format!("timestamp={}{}", timestamp, api_secret).as_bytes());
    format!("{:x}", digest)
}

#[async_trait]
impl BlobStorage for CloudinaryBlobStorage {
    async fn upload(&self, image: Vec<u8>) -> Result<StoredImage, StorageError> {
        let timestamp = get_utc_timestamp() / 1000;
        let signature = sign_upload(timestamp, &self.credentials.api_secret);
        let file = format!("data:image/png;base64,{}", STANDARD.encode(&image));

        let response = self
            .client
            .post(self.upload_endpoint())
            .form(&[
                ("file", file),
                ("api_key", self.credentials.api_key.clone()),
                ("timestamp", timestamp.to_string()),
                ("signature_algorithm", "sha256".to_string()),
                ("signature", signature),
            ])
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
        tracing::debug!("Uploaded image '{}' to Cloudinary", body.public_id);

        Ok(StoredImage {
            url: ImageUrl::new(body.secure_url)
                .map_err(|e| StorageError::InvalidResponse(e.to_string()))?,
            handle: StorageHandle::new(body.public_id)
                .map_err(|e| StorageError::InvalidResponse(e.to_string()))?,
        })
    }

    async fn delete_many(&self, handles: Vec<StorageHandle>) -> Result<(), StorageError> {
        if handles.is_empty() {
            return Ok(());
        }

        let query: Vec<(&str, &str)> = handles
            .iter()
            .map(|handle| ("public_ids[]", handle.as_str()))
            .collect();

        let response = self
            .client
            .delete(self.resources_endpoint())
            .basic_auth(
                &self.credentials.api_key,
                Some(&self.credentials.api_secret),
            )
            .query(&query)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::DeleteFailed(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        tracing::debug!("Deleted {} images from Cloudinary", handles.len());
        Ok(())
    }
}
