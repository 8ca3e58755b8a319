//! UseCase: 中継（プロンプト同期・チャット・入力中インジケーター）
//!
//! サーバーは状態を持たず、送信者以外の参加者へそのまま転送する。
//! 編集中のプロンプトもサーバーには保存しない（途中参加者は最後に生成したプロンプトだけを受け取る）。

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{ConnectionId, ConnectionRepository, RoomEvent};

use super::{RoomBroadcaster, error::RelayError, membership::resolve_member};

pub struct RelayUseCase {
    connections: Arc<dyn ConnectionRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl RelayUseCase {
    pub fn new(connections: Arc<dyn ConnectionRepository>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self {
            connections,
            broadcaster,
        }
    }

    pub async fn sync_prompt(
        &self,
        sender: &ConnectionId,
        room: &str,
        text: String,
    ) -> Result<(), RelayError> {
        self.relay(sender, room, RoomEvent::PromptSynced { text })
            .await
    }

    pub async fn send_message(
        &self,
        sender: &ConnectionId,
        room: &str,
        payload: Value,
    ) -> Result<(), RelayError> {
        self.relay(sender, room, RoomEvent::MessageRelayed { payload })
            .await
    }

    pub async fn typing(
        &self,
        sender: &ConnectionId,
        room: &str,
        payload: Value,
    ) -> Result<(), RelayError> {
        self.relay(sender, room, RoomEvent::TypingRelayed { payload })
            .await
    }

    async fn relay(
        &self,
        sender: &ConnectionId,
        room: &str,
        event: RoomEvent,
    ) -> Result<(), RelayError> {
        let member = resolve_member(self.connections.as_ref(), sender, room).await?;
        tracing::debug!(
            "Relaying '{}' from '{}' in room '{}'",
            event.name(),
            member.display_name,
            member.room_id
        );
        self.broadcaster
            .to_room_except(&member.room_id, sender, &event)
            .await;
        Ok(())
    }
}
