//! Conversion logic between DTOs and domain entities.

use tsudoi_shared::time::timestamp_to_rfc3339;

use crate::domain::{GenerationStatus, HistoryEntry, Member, Room, RoomEvent};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// Domain → WebSocket DTO
// ========================================

impl From<&Member> for dto::MemberInfo {
    fn from(model: &Member) -> Self {
        Self {
            id: model.connection_id.as_str().to_string(),
            name: model.display_name.as_str().to_string(),
        }
    }
}

impl From<&HistoryEntry> for dto::HistoryEntryInfo {
    fn from(model: &HistoryEntry) -> Self {
        Self {
            created_at: model.created_at.value(),
            image_url: model.image_url.as_str().to_string(),
            prompt: model.prompt.as_str().to_string(),
            author: model.author.as_str().to_string(),
        }
    }
}

impl From<GenerationStatus> for dto::GenerationStatusKind {
    fn from(status: GenerationStatus) -> Self {
        match status {
            GenerationStatus::Loading => Self::Loading,
            GenerationStatus::Success => Self::Success,
            GenerationStatus::Error => Self::Error,
        }
    }
}

impl From<&RoomEvent> for dto::ServerEvent {
    fn from(event: &RoomEvent) -> Self {
        match event {
            RoomEvent::RoomCreated { room_id } => Self::RoomCreated(room_id.as_str().to_string()),
            RoomEvent::JoinRejected { reason } => Self::ErrorJoin(reason.clone()),
            RoomEvent::MembersChanged { members } => {
                Self::UpdateUserList(members.iter().map(dto::MemberInfo::from).collect())
            }
            RoomEvent::HistoryChanged { history } => {
                Self::UpdateGallery(history.iter().map(dto::HistoryEntryInfo::from).collect())
            }
            RoomEvent::SharedImage {
                image_url,
                prompt,
                author,
            } => Self::ReceiveSharedImage(dto::SharedImage {
                photo: image_url.as_str().to_string(),
                prompt: prompt.clone(),
                user: author.clone(),
            }),
            RoomEvent::LockStatus { holder } => {
                Self::PromptLockStatus(holder.as_ref().map(|h| h.as_str().to_string()))
            }
            RoomEvent::PromptSynced { text } => Self::ReceivePromptSync(text.clone()),
            RoomEvent::MessageRelayed { payload } => Self::ReceiveMessage(payload.clone()),
            RoomEvent::TypingRelayed { payload } => Self::DisplayTyping(payload.clone()),
            RoomEvent::GenerationStatusChanged {
                status,
                user,
                message,
            } => Self::GenerationStatus(dto::GenerationStatusInfo {
                status: (*status).into(),
                user: user.as_ref().map(|u| u.as_str().to_string()),
                message: message.clone(),
            }),
        }
    }
}

// ========================================
// Domain → HTTP DTO
// ========================================

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .members
                .iter()
                .map(|m| m.display_name.as_str().to_string())
                .collect(),
            history_size: room.history.len(),
            lock_holder: room.lock_holder.as_ref().map(|h| h.as_str().to_string()),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Room> for http::RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .members
                .iter()
                .map(|m| http::MemberDetailDto {
                    id: m.connection_id.as_str().to_string(),
                    name: m.display_name.as_str().to_string(),
                    joined_at: timestamp_to_rfc3339(m.joined_at.value()),
                })
                .collect(),
            lock_holder: room.lock_holder.as_ref().map(|h| h.as_str().to_string()),
            history: room.history.iter().map(dto::HistoryEntryInfo::from).collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}
