//! 外部サービス（Image Generation Service / Blob Storage Service）の trait 定義

use async_trait::async_trait;

use super::{GenerationError, ImageUrl, Prompt, StorageError, StorageHandle};

/// アップロード済みの画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: ImageUrl,
    pub handle: StorageHandle,
}

/// プロンプトから画像を生成するサービス
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// 画像のバイト列を返す
    async fn generate(&self, prompt: &Prompt) -> Result<Vec<u8>, GenerationError>;
}

/// 画像を永続化するサービス
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// 画像をアップロードし、永続 URL と削除用ハンドルを返す
    async fn upload(&self, image: Vec<u8>) -> Result<StoredImage, StorageError>;

    /// 複数のオブジェクトをまとめて削除する（ベストエフォート）
    async fn delete_many(&self, handles: Vec<StorageHandle>) -> Result<(), StorageError>;
}
