//! サーバーからクライアントへ通知するイベント
//!
//! プロトコル（JSON など）には依存しない。ワイヤ形式への変換は
//! Infrastructure 層の DTO が担当する。

use serde_json::Value;

use super::{
    entity::{HistoryEntry, Member},
    value_object::{DisplayName, ImageUrl, RoomId},
};

/// 履歴から同期した画像の送信者名
pub const HISTORY_SYNC_AUTHOR: &str = "System (History)";

/// 生成失敗時にルームへ通知するメッセージ
pub const GENERATION_FAILED_MESSAGE: &str = "Generation Failed";

/// 画像生成の進行状況
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Loading,
    Success,
    Error,
}

/// クライアントへ通知するイベント
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// ルーム作成完了（作成者のみ）
    RoomCreated { room_id: RoomId },
    /// 参加失敗（送信者のみ）
    JoinRejected { reason: String },
    /// 参加者一覧の更新（ルーム全体）
    MembersChanged { members: Vec<Member> },
    /// 生成履歴の更新
    HistoryChanged { history: Vec<HistoryEntry> },
    /// 生成された画像
    SharedImage {
        image_url: ImageUrl,
        prompt: String,
        author: String,
    },
    /// プロンプト編集ロックの状態（None は未ロック）
    LockStatus { holder: Option<DisplayName> },
    /// 編集中プロンプトの中継
    PromptSynced { text: String },
    /// チャットの中継（ペイロードはそのまま転送する）
    MessageRelayed { payload: Value },
    /// 入力中インジケーターの中継
    TypingRelayed { payload: Value },
    /// 画像生成の進行状況（ルーム全体）
    GenerationStatusChanged {
        status: GenerationStatus,
        user: Option<DisplayName>,
        message: Option<String>,
    },
}

impl RoomEvent {
    /// 履歴の最新エントリを参加者へ同期するためのイベント
    pub fn shared_image_from_history(entry: &HistoryEntry) -> Self {
        Self::SharedImage {
            image_url: entry.image_url.clone(),
            prompt: entry.prompt.as_str().to_string(),
            author: HISTORY_SYNC_AUTHOR.to_string(),
        }
    }

    pub fn generation_loading(user: DisplayName) -> Self {
        Self::GenerationStatusChanged {
            status: GenerationStatus::Loading,
            user: Some(user),
            message: None,
        }
    }

    pub fn generation_success(user: DisplayName) -> Self {
        Self::GenerationStatusChanged {
            status: GenerationStatus::Success,
            user: Some(user),
            message: None,
        }
    }

    pub fn generation_error(user: DisplayName) -> Self {
        Self::GenerationStatusChanged {
            status: GenerationStatus::Error,
            user: Some(user),
            message: Some(GENERATION_FAILED_MESSAGE.to_string()),
        }
    }

    /// ログ用のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room_created",
            Self::JoinRejected { .. } => "error_join",
            Self::MembersChanged { .. } => "update_user_list",
            Self::HistoryChanged { .. } => "update_gallery",
            Self::SharedImage { .. } => "receive_shared_image",
            Self::LockStatus { .. } => "prompt_lock_status",
            Self::PromptSynced { .. } => "receive_prompt_sync",
            Self::MessageRelayed { .. } => "receive_message",
            Self::TypingRelayed { .. } => "display_typing",
            Self::GenerationStatusChanged { .. } => "generation_status",
        }
    }
}
