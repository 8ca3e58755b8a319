//! WebSocket message DTOs.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ========================================
// Client → Server
// ========================================

/// Event sent by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    CreateRoom(CreateRoomPayload),
    JoinRoom(JoinRoomPayload),
    StartPromptEdit(PromptEditPayload),
    StopPromptEdit(PromptEditPayload),
    SyncPrompt(SyncPromptPayload),
    SendMessage(RelayPayload),
    Typing(RelayPayload),
    CollaborativeGenerate(GeneratePayload),
}

impl ClientEvent {
    /// Event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "create_room",
            Self::JoinRoom(_) => "join_room",
            Self::StartPromptEdit(_) => "start_prompt_edit",
            Self::StopPromptEdit(_) => "stop_prompt_edit",
            Self::SyncPrompt(_) => "sync_prompt",
            Self::SendMessage(_) => "send_message",
            Self::Typing(_) => "typing",
            Self::CollaborativeGenerate(_) => "collaborative_generate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CreateRoomPayload {
    #[serde(default)]
    pub user: Option<String>,
}

/// `join_room` accepts either `{room, user}` or a bare room id string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JoinRoomPayload {
    Detailed {
        room: String,
        #[serde(default)]
        user: Option<String>,
    },
    RoomOnly(String),
}

impl JoinRoomPayload {
    pub fn into_parts(self) -> (String, Option<String>) {
        match self {
            Self::Detailed { room, user } => (room, user),
            Self::RoomOnly(room) => (room, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptEditPayload {
    pub room: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncPromptPayload {
    pub room: String,
    #[serde(default)]
    pub text: String,
}

/// Chat / typing payload. Everything besides `room` is relayed untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelayPayload {
    pub room: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RelayPayload {
    /// The payload as the client sent it (including `room`)
    pub fn into_value(self) -> Value {
        let mut object = self.rest;
        object.insert("room".to_string(), Value::String(self.room));
        Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratePayload {
    pub room: String,
    pub prompt: String,
    #[serde(default)]
    pub user: Option<String>,
}

// ========================================
// Server → Client
// ========================================

/// Event sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomCreated(String),
    ErrorJoin(String),
    UpdateUserList(Vec<MemberInfo>),
    UpdateGallery(Vec<HistoryEntryInfo>),
    ReceiveSharedImage(SharedImage),
    PromptLockStatus(Option<String>),
    ReceivePromptSync(String),
    ReceiveMessage(Value),
    DisplayTyping(Value),
    GenerationStatus(GenerationStatusInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryInfo {
    pub created_at: i64,
    pub image_url: String,
    pub prompt: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedImage {
    pub photo: String,
    pub prompt: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatusKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStatusInfo {
    pub status: GenerationStatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
