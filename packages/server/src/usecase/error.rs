//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{GenerationError, RepositoryError, StorageError, ValueObjectError};

/// 接続処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("connection '{0}' is already registered")]
    DuplicateConnectionId(String),
}

/// 切断処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("connection '{0}' is not registered")]
    ConnectionNotFound(String),
    #[error(transparent)]
    Leave(#[from] LeaveRoomError),
}

/// ルーム作成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateRoomError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// ルーム参加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("invalid display name: {0}")]
    InvalidDisplayName(ValueObjectError),
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("room is full (capacity: {capacity})")]
    RoomFull { capacity: usize },
    #[error("connection '{0}' is not registered")]
    NotConnected(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl JoinRoomError {
    /// `error_join` としてクライアントに返すメッセージ（通知先がない場合は None）
    pub fn client_message(&self) -> Option<String> {
        match self {
            Self::InvalidDisplayName(ValueObjectError::DisplayNameTooLong { max }) => {
                Some(format!("Display name is too long! Max {} characters.", max))
            }
            Self::InvalidDisplayName(_) => Some("Invalid display name.".to_string()),
            Self::RoomNotFound(_) => {
                Some("Room not found! Please check the ID or create a new room.".to_string())
            }
            Self::RoomFull { capacity } => {
                Some(format!("Room is full! Max {} users allowed.", capacity))
            }
            Self::NotConnected(_) => None,
            Self::Repository(_) => Some("Failed to join the room.".to_string()),
        }
    }
}

/// 送信者がルームの参加者であることの確認に失敗した
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    #[error("connection '{0}' is not registered")]
    NotConnected(String),
    #[error("invalid room id '{0}'")]
    InvalidRoomId(String),
    #[error("connection '{connection_id}' is not a member of room '{room_id}'")]
    NotInRoom {
        connection_id: String,
        room_id: String,
    },
}

/// プロンプト編集ロックのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptLockError {
    #[error(transparent)]
    Membership(#[from] MembershipError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 中継（プロンプト同期・チャット・入力中）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error(transparent)]
    Membership(#[from] MembershipError),
}

/// 画像生成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("invalid prompt: {0}")]
    InvalidPrompt(ValueObjectError),
    #[error("generation failed: {0}")]
    GenerationFailed(GenerationError),
    #[error("storage failed: {0}")]
    StorageFailed(StorageError),
    #[error(transparent)]
    Repository(RepositoryError),
}

/// ルーム退出（Disconnect Sweeper）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveRoomError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// ルーム詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error(transparent)]
    Repository(RepositoryError),
}
