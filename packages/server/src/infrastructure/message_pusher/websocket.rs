//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - ドメインイベント（`RoomEvent`）をワイヤ形式の JSON にエンコードして送信
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! ブロードキャストではイベントを 1 回だけエンコードし、同じ文字列を全宛先に流します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel, RoomEvent},
    infrastructure::dto::websocket::ServerEvent,
};

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信チャンネル
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(event: &RoomEvent) -> Result<String, MessagePushError> {
        serde_json::to_string(&ServerEvent::from(event))
            .map_err(|e| MessagePushError::EncodeFailed(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &RoomEvent,
    ) -> Result<(), MessagePushError> {
        let frame = Self::encode(event)?;
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        sender
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed '{}' to '{}'", event.name(), connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RoomEvent,
    ) -> Result<(), MessagePushError> {
        let frame = Self::encode(event)?;
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => {
                    if let Err(e) = sender.send(frame.clone()) {
                        tracing::warn!("Failed to push '{}' to '{}': {}", event.name(), target, e);
                    }
                }
                None => {
                    tracing::warn!("Connection '{}' not found during broadcast, skipping", target);
                }
            }
        }
        tracing::debug!("Broadcasted '{}'", event.name());

        Ok(())
    }
}
