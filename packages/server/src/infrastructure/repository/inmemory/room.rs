//! InMemory Room Repository 実装（Room Store）
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## ロックの構造
//!
//! ```text
//! RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>
//!        └ ルーム表（作成・削除のみ write）
//!                            └ ルームごとの排他制御
//! ```
//!
//! ロックの取得順は常に「ルーム表 → ルーム」。ルーム単位の操作は
//! ルーム表の read ロックを保持したままルームの Mutex を取るため、
//! 削除途中のルームに参加者が追加されることはない。
//! 異なるルームの操作は read ロックを共有するだけなので互いに待たない。
//! 2 つのルームをロックする `move_member` は、ルーム ID の昇順に Mutex を取る。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    ConnectionId, DEFAULT_HISTORY_CAPACITY, DEFAULT_MEMBER_CAPACITY, Departure, DisplayName,
    HistoryEntry, HistoryUpdate, Member, RepositoryError, Room, RoomId, RoomIdFactory,
    RoomRepository, Timestamp, Transfer,
};

/// ID 衝突時の再試行回数の上限
const MAX_ROOM_ID_ATTEMPTS: usize = 64;

type RoomTable = HashMap<RoomId, Arc<Mutex<Room>>>;

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    rooms: RwLock<RoomTable>,
    member_capacity: usize,
    history_capacity: usize,
}

impl InMemoryRoomRepository {
    /// デフォルトの容量（参加者 4 人、履歴 20 件）で作成
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMBER_CAPACITY, DEFAULT_HISTORY_CAPACITY)
    }

    /// 新しく作成するルームの容量を指定して作成
    pub fn with_capacity(member_capacity: usize, history_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            member_capacity,
            history_capacity,
        }
    }

    /// ルームを排他ロックした状態で `f` を実行する
    async fn with_room<T: Send>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut Room) -> Result<T, RepositoryError> + Send,
    ) -> Result<T, RepositoryError> {
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        let mut room = room.lock().await;
        f(&mut room)
    }
}

/// 参加者を外し、その参加者が保持していたロックを解放する
fn depart(room: &mut Room, connection_id: &ConnectionId) -> Departure {
    let removed = room.remove_member(connection_id);
    let released_lock = removed
        .as_ref()
        .map(|member| room.release_lock_if_held_by(&member.display_name))
        .unwrap_or(false);
    Departure {
        removed,
        released_lock,
        members: room.members.clone(),
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create_room(&self, created_at: Timestamp) -> Result<RoomId, RepositoryError> {
        let mut rooms = self.rooms.write().await;

        for _ in 0..MAX_ROOM_ID_ATTEMPTS {
            let room_id = RoomIdFactory::generate().map_err(|_| {
                RepositoryError::RoomIdExhausted {
                    attempts: MAX_ROOM_ID_ATTEMPTS,
                }
            })?;
            if rooms.contains_key(&room_id) {
                tracing::debug!("Room id '{}' collided, retrying", room_id);
                continue;
            }

            let room = Room::with_capacity(
                room_id.clone(),
                created_at,
                self.member_capacity,
                self.history_capacity,
            );
            rooms.insert(room_id.clone(), Arc::new(Mutex::new(room)));
            return Ok(room_id);
        }

        Err(RepositoryError::RoomIdExhausted {
            attempts: MAX_ROOM_ID_ATTEMPTS,
        })
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        self.with_room(room_id, |room| Ok(room.clone())).await
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.read().await;
        let mut snapshots = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            snapshots.push(room.lock().await.clone());
        }
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.write().await;
        let snapshot = {
            let room = rooms
                .get(room_id)
                .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
            let room = room.lock().await;
            if !room.is_empty() {
                return Err(RepositoryError::RoomNotEmpty(room_id.as_str().to_string()));
            }
            room.clone()
        };
        rooms.remove(room_id);
        Ok(snapshot)
    }

    async fn add_member(&self, room_id: &RoomId, member: Member) -> Result<Room, RepositoryError> {
        self.with_room(room_id, |room| {
            room.add_member(member)?;
            Ok(room.clone())
        })
        .await
    }

    async fn remove_member(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Result<Departure, RepositoryError> {
        self.with_room(room_id, |room| Ok(depart(room, connection_id)))
            .await
    }

    async fn move_member(
        &self,
        from: &RoomId,
        to: &RoomId,
        member: Member,
    ) -> Result<Transfer, RepositoryError> {
        let rooms = self.rooms.read().await;
        let target = rooms
            .get(to)
            .ok_or_else(|| RepositoryError::RoomNotFound(to.as_str().to_string()))?;

        let source = match rooms.get(from) {
            Some(source) if from != to => source,
            _ => {
                let mut target = target.lock().await;
                target.add_member(member)?;
                return Ok(Transfer {
                    departure: None,
                    room: target.clone(),
                });
            }
        };

        let (mut source, mut target) = if from < to {
            let source = source.lock().await;
            (source, target.lock().await)
        } else {
            let target = target.lock().await;
            (source.lock().await, target)
        };

        let connection_id = member.connection_id.clone();
        target.add_member(member)?;
        let departure = depart(&mut source, &connection_id);

        Ok(Transfer {
            departure: Some(departure),
            room: target.clone(),
        })
    }

    async fn member_connection_ids(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ConnectionId>, RepositoryError> {
        self.with_room(room_id, |room| {
            Ok(room
                .members
                .iter()
                .map(|m| m.connection_id.clone())
                .collect())
        })
        .await
    }

    async fn acquire_lock(
        &self,
        room_id: &RoomId,
        display_name: &DisplayName,
    ) -> Result<bool, RepositoryError> {
        self.with_room(room_id, |room| Ok(room.try_acquire_lock(display_name)))
            .await
    }

    async fn release_lock(&self, room_id: &RoomId) -> Result<(), RepositoryError> {
        self.with_room(room_id, |room| {
            room.release_lock();
            Ok(())
        })
        .await
    }

    async fn push_history(
        &self,
        room_id: &RoomId,
        entry: HistoryEntry,
    ) -> Result<HistoryUpdate, RepositoryError> {
        self.with_room(room_id, |room| {
            let evicted = room.push_history(entry);
            Ok(HistoryUpdate {
                history: room.history.iter().cloned().collect(),
                evicted,
            })
        })
        .await
    }

    async fn count_rooms(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ImageUrl, Prompt, StorageHandle};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルームの作成・取得・削除と、参加者・ロック・履歴の操作
    // - 存在しないルームへの操作が RoomNotFound になること
    //
    // 【なぜこのテストが必要か】
    // - Room Store は全ての UseCase が経由する状態の唯一の所有者
    // - 削除済みルームへの操作がクラッシュしないことを保証する
    //
    // 【どのようなシナリオをテストするか】
    // 1. 作成したルーム ID は現存ルームと重複しない
    // 2. 5 人目の参加は RoomFull
    // 3. ロック保持者の退出でロックが解放される
    // 4. 参加者が残っているルームは削除できない
    // 5. 削除後の操作は RoomNotFound
    // 6. ルーム移動は移動先に入れたときだけ元のルームから外す
    // ========================================

    fn member(id: &str, name: &str) -> Member {
        Member::new(
            ConnectionId::new(id.to_string()).unwrap(),
            DisplayName::new(name.to_string()).unwrap(),
            Timestamp::new(1000),
        )
    }

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            created_at: Timestamp::new(n as i64),
            image_url: ImageUrl::new(format!("https://img.example/{n}.png")).unwrap(),
            storage_handle: StorageHandle::new(format!("handle-{n}")).unwrap(),
            prompt: Prompt::new(format!("prompt {n}")).unwrap(),
            author: DisplayName::new("alice".to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_created_room_ids_are_unique_among_live_rooms() {
        // テスト項目: 作成したルーム ID は現存する全てのルームと重複しない
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let mut ids = Vec::new();
        for _ in 0..200 {
            ids.push(repo.create_room(Timestamp::new(0)).await.unwrap());
        }

        // then (期待する結果):
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
        assert_eq!(repo.count_rooms().await, 200);
    }

    #[tokio::test]
    async fn test_new_room_is_empty() {
        // テスト項目: 作成直後のルームは参加者・ロック・履歴が空
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let room_id = repo.create_room(Timestamp::new(42)).await.unwrap();
        let room = repo.get_room(&room_id).await.unwrap();

        // then (期待する結果):
        assert!(room.members.is_empty());
        assert!(room.lock_holder.is_none());
        assert!(room.history.is_empty());
        assert_eq!(room.created_at, Timestamp::new(42));
    }

    #[tokio::test]
    async fn test_get_unknown_room_returns_not_found() {
        // テスト項目: 存在しないルームの取得は RoomNotFound
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_id = RoomId::new("FFFFFF".to_string()).unwrap();

        // when (操作):
        let result = repo.get_room(&room_id).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::RoomNotFound("FFFFFF".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fifth_member_is_rejected() {
        // テスト項目: 5 人目の参加は RoomFull で拒否され、参加者数は 4 のまま
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_id = repo.create_room(Timestamp::new(0)).await.unwrap();
        for i in 0..4 {
            repo.add_member(&room_id, member(&format!("c{i}"), &format!("user{i}")))
                .await
                .unwrap();
        }

        // when (操作):
        let result = repo.add_member(&room_id, member("c4", "user4")).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::RoomFull { capacity: 4 }));
        let room = repo.get_room(&room_id).await.unwrap();
        assert_eq!(room.members.len(), 4);
    }

    #[tokio::test]
    async fn test_remove_lock_holder_releases_lock() {
        // テスト項目: ロック保持者が退出するとロックが解放される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_id = repo.create_room(Timestamp::new(0)).await.unwrap();
        let alice = member("c1", "alice");
        repo.add_member(&room_id, alice.clone()).await.unwrap();
        repo.add_member(&room_id, member("c2", "bob")).await.unwrap();
        assert!(repo.acquire_lock(&room_id, &alice.display_name).await.unwrap());

        // when (操作):
        let departure = repo
            .remove_member(&room_id, &alice.connection_id)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(departure.removed, Some(alice));
        assert!(departure.released_lock);
        assert_eq!(departure.members.len(), 1);
        let room = repo.get_room(&room_id).await.unwrap();
        assert!(room.lock_holder.is_none());
    }

    #[tokio::test]
    async fn test_remove_non_member_is_noop() {
        // テスト項目: 参加していない接続の削除は何も変更しない（冪等性）
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_id = repo.create_room(Timestamp::new(0)).await.unwrap();
        repo.add_member(&room_id, member("c1", "alice")).await.unwrap();

        // when (操作):
        let departure = repo
            .remove_member(&room_id, &ConnectionId::new("ghost".to_string()).unwrap())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(departure.removed, None);
        assert!(!departure.released_lock);
        assert_eq!(departure.members.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_room_requires_empty_room() {
        // テスト項目: 参加者が残っているルームは削除できず、空になれば削除できる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_id = repo.create_room(Timestamp::new(0)).await.unwrap();
        let alice = member("c1", "alice");
        repo.add_member(&room_id, alice.clone()).await.unwrap();

        // when (操作):
        let while_occupied = repo.delete_room(&room_id).await;
        repo.remove_member(&room_id, &alice.connection_id)
            .await
            .unwrap();
        let after_leave = repo.delete_room(&room_id).await;

        // then (期待する結果):
        assert!(matches!(
            while_occupied,
            Err(RepositoryError::RoomNotEmpty(_))
        ));
        assert!(after_leave.is_ok());
        assert!(matches!(
            repo.get_room(&room_id).await,
            Err(RepositoryError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_operations_on_deleted_room_return_not_found() {
        // テスト項目: 削除済みルームへの操作はクラッシュせず RoomNotFound になる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_id = repo.create_room(Timestamp::new(0)).await.unwrap();
        repo.delete_room(&room_id).await.unwrap();

        // when (操作):
        let delete_again = repo.delete_room(&room_id).await;
        let push = repo.push_history(&room_id, entry(0)).await;
        let join = repo.add_member(&room_id, member("c1", "alice")).await;

        // then (期待する結果):
        assert!(matches!(delete_again, Err(RepositoryError::RoomNotFound(_))));
        assert!(matches!(push, Err(RepositoryError::RoomNotFound(_))));
        assert!(matches!(join, Err(RepositoryError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_push_history_reports_eviction() {
        // テスト項目: 容量を超えた追加で最古のエントリが返される
        // given (前提条件):
        let repo = InMemoryRoomRepository::with_capacity(4, 2);
        let room_id = repo.create_room(Timestamp::new(0)).await.unwrap();
        repo.push_history(&room_id, entry(1)).await.unwrap();
        repo.push_history(&room_id, entry(2)).await.unwrap();

        // when (操作):
        let update = repo.push_history(&room_id, entry(3)).await.unwrap();

        // then (期待する結果):
        assert_eq!(update.evicted, Some(entry(1)));
        assert_eq!(update.history, vec![entry(3), entry(2)]);
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        // テスト項目: あるルームの操作は他のルームに影響しない
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room_a = repo.create_room(Timestamp::new(0)).await.unwrap();
        let room_b = repo.create_room(Timestamp::new(0)).await.unwrap();
        let alice = DisplayName::new("alice".to_string()).unwrap();
        let bob = DisplayName::new("bob".to_string()).unwrap();

        // when (操作):
        let a = repo.acquire_lock(&room_a, &alice).await.unwrap();
        let b = repo.acquire_lock(&room_b, &bob).await.unwrap();

        // then (期待する結果):
        assert!(a);
        assert!(b);
        assert_eq!(repo.get_room(&room_a).await.unwrap().lock_holder, Some(alice));
        assert_eq!(repo.get_room(&room_b).await.unwrap().lock_holder, Some(bob));
    }

    #[tokio::test]
    async fn test_move_member_transfers_and_releases_lock() {
        // テスト項目: ルーム移動で移動先に追加され、元のルームのロックが解放される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let from = repo.create_room(Timestamp::new(0)).await.unwrap();
        let to = repo.create_room(Timestamp::new(0)).await.unwrap();
        let alice = member("c1", "alice");
        repo.add_member(&from, alice.clone()).await.unwrap();
        repo.add_member(&from, member("c2", "bob")).await.unwrap();
        repo.acquire_lock(&from, &alice.display_name).await.unwrap();

        // when (操作):
        let transfer = repo.move_member(&from, &to, alice.clone()).await.unwrap();

        // then (期待する結果):
        let departure = transfer.departure.unwrap();
        assert_eq!(departure.removed, Some(alice.clone()));
        assert!(departure.released_lock);
        assert_eq!(departure.members, vec![member("c2", "bob")]);
        assert_eq!(transfer.room.members, vec![alice]);
        assert_eq!(repo.get_room(&from).await.unwrap().lock_holder, None);
    }

    #[tokio::test]
    async fn test_move_member_to_full_room_leaves_both_rooms_untouched() {
        // テスト項目: 満員のルームへの移動は失敗し、元のルームから外れない
        // given (前提条件):
        let repo = InMemoryRoomRepository::with_capacity(2, 8);
        let from = repo.create_room(Timestamp::new(0)).await.unwrap();
        let to = repo.create_room(Timestamp::new(0)).await.unwrap();
        let alice = member("c1", "alice");
        repo.add_member(&from, alice.clone()).await.unwrap();
        repo.acquire_lock(&from, &alice.display_name).await.unwrap();
        repo.add_member(&to, member("c2", "bob")).await.unwrap();
        repo.add_member(&to, member("c3", "carol")).await.unwrap();

        // when (操作):
        let result = repo.move_member(&from, &to, alice.clone()).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::RoomFull { capacity: 2 }));
        let source = repo.get_room(&from).await.unwrap();
        assert_eq!(source.members, vec![alice.clone()]);
        assert_eq!(source.lock_holder, Some(alice.display_name));
        assert_eq!(repo.get_room(&to).await.unwrap().members.len(), 2);
    }

    #[tokio::test]
    async fn test_move_member_to_unknown_room_keeps_source() {
        // テスト項目: 存在しないルームへの移動は RoomNotFound で、元のルームは残る
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let from = repo.create_room(Timestamp::new(0)).await.unwrap();
        let alice = member("c1", "alice");
        repo.add_member(&from, alice.clone()).await.unwrap();
        repo.push_history(&from, entry(1)).await.unwrap();
        let unknown = RoomId::new("FFFFFF".to_string()).unwrap();

        // when (操作):
        let result = repo.move_member(&from, &unknown, alice.clone()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::RoomNotFound("FFFFFF".to_string()))
        );
        let source = repo.get_room(&from).await.unwrap();
        assert_eq!(source.members, vec![alice]);
        assert_eq!(source.history, vec![entry(1)]);
    }
}
