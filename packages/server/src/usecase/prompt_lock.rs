//! UseCase: プロンプト編集ロック
//!
//! - 取得: 未ロックか、同じ表示名が保持していれば成功。成功したら送信者以外に通知する。
//!   取得できなかった場合は何も通知しない（キューイングもしない）。
//! - 解放: 参加者なら誰でも無条件に解放できる。ルーム全体に通知する。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PromptLockUseCase::acquire() / release() メソッド
//!
//! ### なぜこのテストが必要か
//! - ロックはルーム内で同時に 1 人だけがプロンプトを編集するための仕組み
//! - 拒否された取得要求が通知を発生させないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：取得・同じ人の再取得・解放
//! - 異常系：他人が保持中の取得、参加していないルームへの要求

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, RoomEvent, RoomRepository};

use super::{RoomBroadcaster, error::PromptLockError, membership::resolve_member};

pub struct PromptLockUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl PromptLockUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        broadcaster: Arc<RoomBroadcaster>,
    ) -> Self {
        Self {
            rooms,
            connections,
            broadcaster,
        }
    }

    /// ロックの取得を試みる。取得できたら true
    pub async fn acquire(
        &self,
        connection_id: &ConnectionId,
        room: &str,
    ) -> Result<bool, PromptLockError> {
        let member = resolve_member(self.connections.as_ref(), connection_id, room).await?;

        let granted = self
            .rooms
            .acquire_lock(&member.room_id, &member.display_name)
            .await?;

        if granted {
            tracing::debug!(
                "Prompt lock of room '{}' held by '{}'",
                member.room_id,
                member.display_name
            );
            self.broadcaster
                .to_room_except(
                    &member.room_id,
                    connection_id,
                    &RoomEvent::LockStatus {
                        holder: Some(member.display_name),
                    },
                )
                .await;
        } else {
            tracing::debug!(
                "Prompt lock of room '{}' denied to '{}'",
                member.room_id,
                member.display_name
            );
        }

        Ok(granted)
    }

    /// ロックを解放する（冪等）
    pub async fn release(
        &self,
        connection_id: &ConnectionId,
        room: &str,
    ) -> Result<(), PromptLockError> {
        let member = resolve_member(self.connections.as_ref(), connection_id, room).await?;

        self.rooms.release_lock(&member.room_id).await?;
        tracing::debug!(
            "Prompt lock of room '{}' released by '{}'",
            member.room_id,
            member.display_name
        );

        self.broadcaster
            .to_room(&member.room_id, &RoomEvent::LockStatus { holder: None })
            .await;

        Ok(())
    }
}
