//! UseCase: ルーム退出（Disconnect Sweeper）
//!
//! 切断時に呼ばれる。別のルームへ移ったときの元のルームの後始末も
//! `settle_departure` で同じ経路を通る。
//!
//! 1. Connection Registry から現在のルームを引く（未参加なら何もしない）
//! 2. 参加者から外す（ロックを保持していれば解放し、その旨をルームに通知）
//! 3. 更新後の参加者一覧をルームに通知
//! 4. 参加者が 0 人になったらルームを削除し、履歴の画像をまとめて削除する
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - ロック解放・参加者一覧の通知・最後の参加者退出時の後始末
//!
//! ### なぜこのテストが必要か
//! - ルームを破棄する唯一の経路であり、ストレージの後始末もここで行う
//! - ロック保持者の切断でロックが残り続けると、ルームの誰も編集できなくなる
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者が残る退出、最後の参加者の退出
//! - 異常系：一括削除の失敗（ルームは削除される）
//! - エッジケース：未参加の接続、既に削除されたルーム、履歴が空のルーム

use std::sync::Arc;

use crate::domain::{
    BlobStorage, ConnectionId, ConnectionRepository, Departure, RepositoryError, RoomEvent,
    RoomId, RoomRepository,
};

use super::{RoomBroadcaster, error::LeaveRoomError};

/// 退出の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// どのルームにも参加していなかった
    NotInRoom,
    /// ルームから退出した
    Left { room_id: RoomId, room_deleted: bool },
}

pub struct LeaveRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    broadcaster: Arc<RoomBroadcaster>,
    storage: Arc<dyn BlobStorage>,
}

impl LeaveRoomUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        broadcaster: Arc<RoomBroadcaster>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        Self {
            rooms,
            connections,
            broadcaster,
            storage,
        }
    }

    pub async fn execute(&self, connection_id: &ConnectionId) -> Result<LeaveOutcome, LeaveRoomError> {
        let Some(room_id) = self
            .connections
            .get(connection_id)
            .await
            .and_then(|c| c.current_room)
        else {
            return Ok(LeaveOutcome::NotInRoom);
        };

        let departure = match self.rooms.remove_member(&room_id, connection_id).await {
            Ok(departure) => departure,
            Err(RepositoryError::RoomNotFound(_)) => {
                tracing::debug!("Room '{}' already deleted", room_id);
                self.connections.clear_room(connection_id).await;
                return Ok(LeaveOutcome::NotInRoom);
            }
            Err(e) => return Err(e.into()),
        };
        self.connections.clear_room(connection_id).await;

        let room_deleted = self.settle_departure(&room_id, &departure).await;

        Ok(LeaveOutcome::Left {
            room_id,
            room_deleted,
        })
    }

    /// 退出の結果をルームに通知し、空になったルームを後始末する
    ///
    /// 参加者が実際に外れた場合だけ通知する。ルームを削除した場合は true。
    /// ルーム移動で元のルームから外れたときも、この経路で後始末する。
    pub(crate) async fn settle_departure(&self, room_id: &RoomId, departure: &Departure) -> bool {
        let Some(member) = &departure.removed else {
            return false;
        };
        tracing::info!("'{}' left room '{}'", member.display_name, room_id);

        if departure.released_lock {
            self.broadcaster
                .to_room(room_id, &RoomEvent::LockStatus { holder: None })
                .await;
        }
        self.broadcaster
            .to_room(
                room_id,
                &RoomEvent::MembersChanged {
                    members: departure.members.clone(),
                },
            )
            .await;

        departure.members.is_empty() && self.teardown(room_id).await
    }

    /// 空になったルームを削除する。削除した場合は true
    async fn teardown(&self, room_id: &RoomId) -> bool {
        let room = match self.rooms.delete_room(room_id).await {
            Ok(room) => room,
            Err(RepositoryError::RoomNotEmpty(_)) => {
                // 退出と削除の間に誰かが参加した
                tracing::debug!("Room '{}' was re-joined before teardown", room_id);
                return false;
            }
            Err(e) => {
                tracing::debug!("Room '{}' teardown skipped: {}", room_id, e);
                return false;
            }
        };

        let handles = room.storage_handles();
        tracing::info!(
            "Room '{}' deleted ({} stored images to purge)",
            room_id,
            handles.len()
        );

        if !handles.is_empty()
            && let Err(e) = self.storage.delete_many(handles).await
        {
            tracing::error!("Failed to purge images of room '{}': {}", room_id, e);
        }

        true
    }
}
