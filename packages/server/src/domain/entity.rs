//! エンティティ（Entity）
//!
//! - `Connection`: ライブな接続 1 つ分の状態（Connection Registry が保持）
//! - `Member`: ルームの参加者
//! - `HistoryEntry`: 画像生成結果 1 件
//! - `Room`: 参加者・プロンプト編集ロック・生成履歴を持つ隔離単位

use std::collections::VecDeque;

use super::{
    error::RoomError,
    value_object::{ConnectionId, DisplayName, ImageUrl, Prompt, RoomId, StorageHandle, Timestamp},
};

/// ルームの最大参加者数（デフォルト）
pub const DEFAULT_MEMBER_CAPACITY: usize = 4;

/// ルームの生成履歴の最大件数（デフォルト）
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// ライブな接続
///
/// トランスポート接続時に作成され、切断時に破棄される。永続化はしない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    /// join 時に渡された表示名（join 前は None）
    pub display_name: Option<DisplayName>,
    /// 参加中のルーム（join 成功までは None）
    pub current_room: Option<RoomId>,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, connected_at: Timestamp) -> Self {
        Self {
            id,
            display_name: None,
            current_room: None,
            connected_at,
        }
    }

    /// 指定したルームに参加中かどうか
    pub fn is_in_room(&self, room_id: &RoomId) -> bool {
        self.current_room.as_ref() == Some(room_id)
    }
}

/// ルームの参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub display_name: DisplayName,
    pub joined_at: Timestamp,
}

impl Member {
    pub fn new(connection_id: ConnectionId, display_name: DisplayName, joined_at: Timestamp) -> Self {
        Self {
            connection_id,
            display_name,
            joined_at,
        }
    }
}

/// 画像生成結果 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub created_at: Timestamp,
    pub image_url: ImageUrl,
    pub storage_handle: StorageHandle,
    pub prompt: Prompt,
    pub author: DisplayName,
}

/// Room エンティティ
///
/// 不変条件:
/// - `members.len() <= member_capacity`
/// - `history.len() <= history_capacity`（新しい順、溢れた最古のエントリは追い出される）
/// - `lock_holder` は解放されるまで取得した表示名を保持する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub created_at: Timestamp,
    /// 参加順
    pub members: Vec<Member>,
    pub lock_holder: Option<DisplayName>,
    /// 新しい順
    pub history: VecDeque<HistoryEntry>,
    member_capacity: usize,
    history_capacity: usize,
}

impl Room {
    /// デフォルトの容量で空のルームを作成
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self::with_capacity(
            id,
            created_at,
            DEFAULT_MEMBER_CAPACITY,
            DEFAULT_HISTORY_CAPACITY,
        )
    }

    /// 容量を指定して空のルームを作成
    pub fn with_capacity(
        id: RoomId,
        created_at: Timestamp,
        member_capacity: usize,
        history_capacity: usize,
    ) -> Self {
        Self {
            id,
            created_at,
            members: Vec::with_capacity(member_capacity),
            lock_holder: None,
            history: VecDeque::with_capacity(history_capacity),
            member_capacity,
            history_capacity,
        }
    }

    pub fn member_capacity(&self) -> usize {
        self.member_capacity
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.member_capacity
    }

    pub fn has_member(&self, connection_id: &ConnectionId) -> bool {
        self.members
            .iter()
            .any(|m| &m.connection_id == connection_id)
    }

    /// 参加者を末尾に追加する
    pub fn add_member(&mut self, member: Member) -> Result<(), RoomError> {
        if self.has_member(&member.connection_id) {
            return Err(RoomError::AlreadyMember(
                member.connection_id.as_str().to_string(),
            ));
        }
        if self.is_full() {
            return Err(RoomError::RoomFull {
                capacity: self.member_capacity,
            });
        }
        self.members.push(member);
        Ok(())
    }

    /// 参加者を削除する。存在しなければ None
    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let index = self
            .members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        Some(self.members.remove(index))
    }

    /// プロンプト編集ロックの取得を試みる
    ///
    /// 未ロック、または同じ表示名が保持している場合のみ成功する。
    pub fn try_acquire_lock(&mut self, display_name: &DisplayName) -> bool {
        match &self.lock_holder {
            Some(holder) if holder != display_name => false,
            _ => {
                self.lock_holder = Some(display_name.clone());
                true
            }
        }
    }

    /// ロックを無条件に解放する（冪等）
    pub fn release_lock(&mut self) {
        self.lock_holder = None;
    }

    /// 指定した表示名がロックを保持していれば解放する
    pub fn release_lock_if_held_by(&mut self, display_name: &DisplayName) -> bool {
        if self.lock_holder.as_ref() == Some(display_name) {
            self.lock_holder = None;
            true
        } else {
            false
        }
    }

    /// 生成結果を先頭に追加し、容量を超えた場合は最古のエントリを追い出して返す
    pub fn push_history(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.history.push_front(entry);
        if self.history.len() > self.history_capacity {
            self.history.pop_back()
        } else {
            None
        }
    }

    pub fn latest_entry(&self) -> Option<&HistoryEntry> {
        self.history.front()
    }

    /// 履歴中の全ストレージハンドル
    pub fn storage_handles(&self) -> Vec<StorageHandle> {
        self.history
            .iter()
            .map(|entry| entry.storage_handle.clone())
            .collect()
    }
}
