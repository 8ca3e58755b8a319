//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - ルームからの退出（Disconnect Sweeper）、送信チャンネルと Registry からの削除
//!
//! ### なぜこのテストが必要か
//! - 切断後に送信チャンネルや Registry のエントリが残るとリークになる
//! - 素早く切断が繰り返されてもクラッシュしないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム参加中の切断
//! - エッジケース：ルーム未参加の切断、同じ接続の二重切断

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, MessagePusher};

use super::{LeaveOutcome, LeaveRoomUseCase, error::DisconnectError};

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    leave_room: Arc<LeaveRoomUseCase>,
    /// Connection Registry
    connections: Arc<dyn ConnectionRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        leave_room: Arc<LeaveRoomUseCase>,
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            leave_room,
            connections,
            message_pusher,
        }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(LeaveOutcome)` - 退出したルーム（参加していなければ `NotInRoom`）
    /// * `Err(DisconnectError)` - 接続が登録されていなかった
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<LeaveOutcome, DisconnectError> {
        // 1. ルームから退出
        let outcome = self.leave_room.execute(connection_id).await?;

        // 2. 送信チャンネルを登録解除
        self.message_pusher.unregister_client(connection_id).await;

        // 3. Registry から削除
        if self.connections.unregister(connection_id).await.is_none() {
            return Err(DisconnectError::ConnectionNotFound(
                connection_id.to_string(),
            ));
        }

        Ok(outcome)
    }
}
