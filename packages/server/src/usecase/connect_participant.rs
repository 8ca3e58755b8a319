//! UseCase: 接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - Connection Registry への登録と MessagePusher への送信チャンネル登録
//!
//! ### なぜこのテストが必要か
//! - 以降の全てのイベント処理は Connection Registry を引いて送信者を解決する
//! - 登録漏れがあると join やロックが全て NotConnected で落ちる
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続の登録（ルーム未参加の状態で登録される）
//! - 異常系：同じ接続 ID での二重登録

use std::sync::Arc;

use tsudoi_shared::time::get_utc_timestamp;

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, MessagePusher, PusherChannel, Timestamp,
};

use super::error::ConnectError;

/// 接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Connection Registry
    connections: Arc<dyn ConnectionRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
        }
    }

    /// 接続を登録する
    ///
    /// # Arguments
    ///
    /// * `connection_id` - トランスポート接続ごとに払い出した ID
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Timestamp)` - 接続時刻
    /// * `Err(ConnectError)` - 同じ ID が既に登録されている
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<Timestamp, ConnectError> {
        // 1. 重複チェック
        if self.connections.get(&connection_id).await.is_some() {
            return Err(ConnectError::DuplicateConnectionId(
                connection_id.into_string(),
            ));
        }

        // 2. Connection Registry に登録（ルーム未参加）
        let connected_at = Timestamp::new(get_utc_timestamp());
        self.connections
            .register(Connection::new(connection_id.clone(), connected_at))
            .await;

        // 3. MessagePusher に送信チャンネルを登録
        self.message_pusher
            .register_client(connection_id, sender)
            .await;

        Ok(connected_at)
    }
}
