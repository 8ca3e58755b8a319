//! UseCase: ルーム参加
//!
//! 参加に成功すると:
//! - ルーム全体に `MembersChanged`
//! - 参加者本人にだけ同期イベント（履歴一覧、最新の画像とプロンプト、ロック状態）
//!
//! 失敗した場合は本人にだけ `JoinRejected` を返す。参加中のルームがあれば
//! そのルームに留まる（移動先の検証と元のルームからの退出は Room Store が
//! まとめて行う）。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 参加人数の上限、同期イベントの内容と宛先、再参加の扱い
//!
//! ### なぜこのテストが必要か
//! - 参加人数の上限（4 人）はルームの不変条件
//! - 途中参加者が直近の生成結果を見られることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：空のルーム・履歴のあるルームへの参加
//! - 異常系：存在しないルーム、満員のルーム、長すぎる表示名
//! - エッジケース：表示名なし（Guest）、同じルームへの再参加、別ルームへの移動

use std::sync::Arc;

use tsudoi_shared::time::get_utc_timestamp;

use crate::domain::{
    ConnectionId, ConnectionRepository, DisplayName, Member, RepositoryError, Room, RoomEvent,
    RoomId, RoomRepository, Timestamp,
};

use super::{LeaveRoomUseCase, RoomBroadcaster, error::JoinRoomError};

pub struct JoinRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    broadcaster: Arc<RoomBroadcaster>,
    leave_room: Arc<LeaveRoomUseCase>,
}

impl JoinRoomUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        broadcaster: Arc<RoomBroadcaster>,
        leave_room: Arc<LeaveRoomUseCase>,
    ) -> Self {
        Self {
            rooms,
            connections,
            broadcaster,
            leave_room,
        }
    }

    /// ルームに参加する
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 参加する接続
    /// * `room` - クライアントが指定したルーム ID（前後の空白・小文字は正規化する）
    /// * `user` - 表示名（未指定・空白のみは Guest）
    ///
    /// # Returns
    ///
    /// * `Ok(Room)` - 参加後のスナップショット
    /// * `Err(JoinRoomError)` - 参加失敗（本人には `JoinRejected` 送信済み）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room: String,
        user: Option<String>,
    ) -> Result<Room, JoinRoomError> {
        let result = self.join(connection_id, room, user).await;

        if let Err(e) = &result {
            tracing::warn!("Join rejected for '{}': {}", connection_id, e);
            if let Some(reason) = e.client_message() {
                self.broadcaster
                    .to_connection(connection_id, &RoomEvent::JoinRejected { reason })
                    .await;
            }
        }

        result
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        room: String,
        user: Option<String>,
    ) -> Result<Room, JoinRoomError> {
        let display_name =
            DisplayName::try_from(user).map_err(JoinRoomError::InvalidDisplayName)?;
        let room_id = RoomId::new(room.clone()).map_err(|_| JoinRoomError::RoomNotFound(room))?;

        let connection = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| JoinRoomError::NotConnected(connection_id.to_string()))?;

        let previous = match connection.current_room {
            Some(current) if current == room_id => {
                // 同じルームへの再参加は同期だけやり直す
                let room = self.rooms.get_room(&room_id).await.map_err(map_join_error)?;
                self.send_sync(connection_id, &room).await;
                return Ok(room);
            }
            other => other,
        };

        // Registry を先に更新する。ルームに追加した後で中断されても
        // 退出処理が参加先のルームを見つけられる
        self.connections
            .assign_room(connection_id, room_id.clone(), display_name.clone())
            .await
            .map_err(|_| JoinRoomError::NotConnected(connection_id.to_string()))?;

        let member = Member::new(
            connection_id.clone(),
            display_name.clone(),
            Timestamp::new(get_utc_timestamp()),
        );
        let joined = match &previous {
            Some(from) => {
                tracing::info!(
                    "'{}' moves from room '{}' to '{}'",
                    connection_id,
                    from,
                    room_id
                );
                self.rooms
                    .move_member(from, &room_id, member)
                    .await
                    .map(|transfer| (transfer.room, transfer.departure))
            }
            None => self
                .rooms
                .add_member(&room_id, member)
                .await
                .map(|room| (room, None)),
        };

        let (room, departure) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                // 参加できなかった場合は元のルームに留まる
                self.restore_registry(connection_id, previous, connection.display_name)
                    .await;
                return Err(map_join_error(e));
            }
        };

        if let (Some(from), Some(departure)) = (&previous, &departure) {
            self.leave_room.settle_departure(from, departure).await;
        }

        tracing::info!(
            "'{}' joined room '{}' as '{}' ({}/{})",
            connection_id,
            room_id,
            display_name,
            room.members.len(),
            room.member_capacity()
        );

        self.broadcaster
            .to_room(
                &room_id,
                &RoomEvent::MembersChanged {
                    members: room.members.clone(),
                },
            )
            .await;
        self.send_sync(connection_id, &room).await;

        Ok(room)
    }

    /// 参加者本人にルームの現在の状態を送る
    async fn send_sync(&self, connection_id: &ConnectionId, room: &Room) {
        self.broadcaster
            .to_connection(
                connection_id,
                &RoomEvent::HistoryChanged {
                    history: room.history.iter().cloned().collect(),
                },
            )
            .await;

        if let Some(latest) = room.latest_entry() {
            self.broadcaster
                .to_connection(connection_id, &RoomEvent::shared_image_from_history(latest))
                .await;
            self.broadcaster
                .to_connection(
                    connection_id,
                    &RoomEvent::PromptSynced {
                        text: latest.prompt.as_str().to_string(),
                    },
                )
                .await;
        }

        self.broadcaster
            .to_connection(
                connection_id,
                &RoomEvent::LockStatus {
                    holder: room.lock_holder.clone(),
                },
            )
            .await;
    }

    /// 参加に失敗した接続の Registry を参加前の状態に戻す
    async fn restore_registry(
        &self,
        connection_id: &ConnectionId,
        previous: Option<RoomId>,
        display_name: Option<DisplayName>,
    ) {
        let Some(room_id) = previous else {
            self.connections.clear_room(connection_id).await;
            return;
        };
        let display_name = display_name.unwrap_or_else(DisplayName::guest);
        if let Err(e) = self
            .connections
            .assign_room(connection_id, room_id, display_name)
            .await
        {
            tracing::debug!("'{}' disconnected while joining: {}", connection_id, e);
        }
    }
}

fn map_join_error(e: RepositoryError) -> JoinRoomError {
    match e {
        RepositoryError::RoomNotFound(id) => JoinRoomError::RoomNotFound(id),
        RepositoryError::RoomFull { capacity } => JoinRoomError::RoomFull { capacity },
        other => JoinRoomError::Repository(other),
    }
}
