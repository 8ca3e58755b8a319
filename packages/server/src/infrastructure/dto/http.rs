//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::HistoryEntryInfo;

/// Room summary for `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub members: Vec<String>,
    pub history_size: usize,
    pub lock_holder: Option<String>,
    /// RFC 3339
    pub created_at: String,
}

/// Room detail for `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub members: Vec<MemberDetailDto>,
    pub lock_holder: Option<String>,
    pub history: Vec<HistoryEntryInfo>,
    /// RFC 3339
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDetailDto {
    pub id: String,
    pub name: String,
    /// RFC 3339
    pub joined_at: String,
}
