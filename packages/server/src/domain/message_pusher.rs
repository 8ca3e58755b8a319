//! MessagePusher trait 定義
//!
//! クライアントへのイベント送信（通知）を抽象化します。
//! 宛先の解決（ルーム全体、送信者以外、送信者のみ）は UseCase 層が行い、
//! このトレイトは解決済みの接続 ID に対して送信するだけです。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError, RoomEvent};

/// クライアントへの送信チャンネル（エンコード済みのフレームを流す）
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続にイベントを送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &RoomEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にイベントを送信（一部の失敗は許容する）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RoomEvent,
    ) -> Result<(), MessagePushError>;
}
