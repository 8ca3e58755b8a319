//! 宛先の解決とイベント送信
//!
//! 宛先は 3 種類:
//! - 送信者のみ（`to_connection`）
//! - ルーム全体（`to_room`）
//! - 送信者以外のルーム全体（`to_room_except`）
//!
//! 送信はベストエフォート。失敗はログに残すだけで呼び出し側には返さない。

use std::sync::Arc;

use crate::domain::{
    ConnectionId, MessagePusher, RepositoryError, RoomEvent, RoomId, RoomRepository,
};

pub struct RoomBroadcaster {
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RoomBroadcaster {
    pub fn new(rooms: Arc<dyn RoomRepository>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            rooms,
            message_pusher,
        }
    }

    pub async fn to_connection(&self, connection_id: &ConnectionId, event: &RoomEvent) {
        if let Err(e) = self.message_pusher.push_to(connection_id, event).await {
            tracing::warn!(
                "Failed to push '{}' to connection '{}': {}",
                event.name(),
                connection_id,
                e
            );
        }
    }

    pub async fn to_room(&self, room_id: &RoomId, event: &RoomEvent) {
        self.fan_out(room_id, None, event).await;
    }

    pub async fn to_room_except(
        &self,
        room_id: &RoomId,
        sender: &ConnectionId,
        event: &RoomEvent,
    ) {
        self.fan_out(room_id, Some(sender), event).await;
    }

    async fn fan_out(&self, room_id: &RoomId, exclude: Option<&ConnectionId>, event: &RoomEvent) {
        // 宛先は送信の直前に引き直す（途中で削除されたルームには何も送らない）
        let targets = match self.rooms.member_connection_ids(room_id).await {
            Ok(ids) => ids,
            Err(RepositoryError::RoomNotFound(_)) => {
                tracing::debug!(
                    "Room '{}' is gone, dropping '{}' broadcast",
                    room_id,
                    event.name()
                );
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to resolve members of room '{}': {}", room_id, e);
                return;
            }
        };

        let targets: Vec<ConnectionId> = targets
            .into_iter()
            .filter(|id| Some(id) != exclude)
            .collect();

        if targets.is_empty() {
            return;
        }

        if let Err(e) = self.message_pusher.broadcast(targets, event).await {
            tracing::warn!(
                "Failed to broadcast '{}' to room '{}': {}",
                event.name(),
                room_id,
                e
            );
        }
    }
}
