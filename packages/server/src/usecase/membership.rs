//! 送信者が指定したルームの参加者かどうかを Connection Registry で確認する

use crate::domain::{ConnectionId, ConnectionRepository, DisplayName, RoomId};

use super::error::MembershipError;

/// 参加中のルームと、参加時の表示名
pub(crate) struct CurrentMember {
    pub room_id: RoomId,
    pub display_name: DisplayName,
}

pub(crate) async fn resolve_member(
    connections: &dyn ConnectionRepository,
    connection_id: &ConnectionId,
    room: &str,
) -> Result<CurrentMember, MembershipError> {
    let room_id = RoomId::new(room.to_string())
        .map_err(|_| MembershipError::InvalidRoomId(room.to_string()))?;

    let connection = connections
        .get(connection_id)
        .await
        .ok_or_else(|| MembershipError::NotConnected(connection_id.to_string()))?;

    if !connection.is_in_room(&room_id) {
        return Err(MembershipError::NotInRoom {
            connection_id: connection_id.to_string(),
            room_id: room_id.into_string(),
        });
    }

    Ok(CurrentMember {
        room_id,
        display_name: connection.display_name.unwrap_or_else(DisplayName::guest),
    })
}
