//! ドメイン層のエラー定義

use std::time::Duration;

use thiserror::Error;

/// 値オブジェクトの生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    EmptyConnectionId,
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("prompt must be at most {max} characters")]
    PromptTooLong { max: usize },
    #[error("image url must not be empty")]
    EmptyImageUrl,
    #[error("storage handle must not be empty")]
    EmptyStorageHandle,
}

/// Room エンティティの不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room is full (capacity: {capacity})")]
    RoomFull { capacity: usize },
    #[error("connection '{0}' is already a member of this room")]
    AlreadyMember(String),
}

/// Repository のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("room is full (capacity: {capacity})")]
    RoomFull { capacity: usize },
    #[error("connection '{0}' is already a member of room")]
    AlreadyMember(String),
    #[error("room '{0}' still has members")]
    RoomNotEmpty(String),
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),
    #[error("failed to allocate a unique room id after {attempts} attempts")]
    RoomIdExhausted { attempts: usize },
}

impl From<RoomError> for RepositoryError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::RoomFull { capacity } => Self::RoomFull { capacity },
            RoomError::AlreadyMember(id) => Self::AlreadyMember(id),
        }
    }
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' not found")]
    ClientNotFound(String),
    #[error("failed to push message: {0}")]
    PushFailed(String),
    #[error("failed to encode event: {0}")]
    EncodeFailed(String),
}

/// Image Generation Service のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("image generation request failed: {0}")]
    RequestFailed(String),
    #[error("image generation service returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("image generation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Blob Storage Service のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("blob storage returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("blob storage timed out after {0:?}")]
    TimedOut(Duration),
}
