//! 値オブジェクト（Value Object）
//!
//! 不変で、生成時にバリデーションを行う型をまとめています。
//! 生成に成功した値は常に不変条件を満たします。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

/// ルーム ID の長さ（16 進数 6 文字）
pub const ROOM_ID_LENGTH: usize = 6;

/// 表示名の最大文字数
pub const DISPLAY_NAME_MAX_CHARS: usize = 64;

/// プロンプトの最大文字数
pub const PROMPT_MAX_CHARS: usize = 4000;

/// 表示名が省略されたときに使う名前
pub const GUEST_NAME: &str = "Guest";

/// 接続 ID
///
/// トランスポート接続ごとに払い出される不透明な識別子。
/// 接続中に再利用されることはない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// ランダムな接続 ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 既存の文字列から ConnectionId を作成
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyConnectionId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ルーム ID
///
/// 英大文字の 16 進数 6 文字（例: `A1B2C3`）。
/// クライアントから受け取った値は前後の空白を除去し、大文字化してから検証する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let normalized = value.trim().to_ascii_uppercase();
        let valid = normalized.len() == ROOM_ID_LENGTH
            && normalized.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ValueObjectError::InvalidRoomId(value));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 表示名
///
/// 一意性は検証しない。空白のみの名前は `Guest` として扱う。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Self::guest());
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX_CHARS {
            return Err(ValueObjectError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// 名前が省略されたときの表示名
    pub fn guest() -> Self {
        Self(GUEST_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<Option<String>> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value {
            Some(name) => Self::new(name),
            None => Ok(Self::guest()),
        }
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 画像生成プロンプト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyPrompt);
        }
        if trimmed.chars().count() > PROMPT_MAX_CHARS {
            return Err(ValueObjectError::PromptTooLong {
                max: PROMPT_MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Blob Storage 上の画像の永続 URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyImageUrl);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Blob Storage のオブジェクトを後から削除するための不透明なハンドル
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageHandle(String);

impl StorageHandle {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyStorageHandle);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix タイムスタンプ（ミリ秒、UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
