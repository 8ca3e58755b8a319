//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## Room Store の並行性
//!
//! ルームの状態を変更する操作は、実装側でルームごとの排他制御の下で
//! 1 回の呼び出しとして完結させること。呼び出し側は Room への参照を保持せず、
//! 毎回ルーム ID で引き直す（途中で削除されたルームは `RoomNotFound` になる）。

use async_trait::async_trait;

use super::{
    ConnectionId, DisplayName, HistoryEntry, Member, RepositoryError, Room, RoomId, Timestamp,
    entity::Connection,
};

/// 参加者削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// 削除された参加者（参加していなかった場合は None）
    pub removed: Option<Member>,
    /// 削除に伴ってロックが解放されたか
    pub released_lock: bool,
    /// 削除後の参加者一覧
    pub members: Vec<Member>,
}

/// ルーム移動の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// 元のルームからの退出（元のルームが既に削除されていた場合は None）
    pub departure: Option<Departure>,
    /// 移動先のスナップショット
    pub room: Room,
}

/// 履歴追加の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryUpdate {
    /// 追加後の履歴（新しい順）
    pub history: Vec<HistoryEntry>,
    /// 容量超過で追い出されたエントリ
    pub evicted: Option<HistoryEntry>,
}

/// Room Repository trait（Room Store）
///
/// プロセス全体のルーム ID → Room の表。全ての Room を排他的に所有する。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 現在存在するルームと重複しない ID で空のルームを作成
    async fn create_room(&self, created_at: Timestamp) -> Result<RoomId, RepositoryError>;

    /// Room のスナップショットを取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 全ルームのスナップショットを取得（ID 順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// ルームを削除して最後の状態を返す
    ///
    /// 参加者が残っている場合は `RoomNotEmpty` で失敗する。
    /// 外部ストレージの後始末は呼び出し側の責務。
    async fn delete_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 参加者を追加し、追加後のスナップショットを返す
    async fn add_member(&self, room_id: &RoomId, member: Member) -> Result<Room, RepositoryError>;

    /// 参加者を削除する。その参加者の表示名がロックを保持していれば解放する
    async fn remove_member(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Result<Departure, RepositoryError>;

    /// 参加者を `from` から `to` へ移す
    ///
    /// 移動先への追加が成功した場合だけ元のルームから外す。両方のルームを
    /// ロックした状態で行うため、失敗したときはどちらのルームも変更されない。
    async fn move_member(
        &self,
        from: &RoomId,
        to: &RoomId,
        member: Member,
    ) -> Result<Transfer, RepositoryError>;

    /// ルームの参加者の接続 ID 一覧（参加順）
    async fn member_connection_ids(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ConnectionId>, RepositoryError>;

    /// プロンプト編集ロックの取得を試みる（取得できたら true）
    async fn acquire_lock(
        &self,
        room_id: &RoomId,
        display_name: &DisplayName,
    ) -> Result<bool, RepositoryError>;

    /// プロンプト編集ロックを無条件に解放する
    async fn release_lock(&self, room_id: &RoomId) -> Result<(), RepositoryError>;

    /// 生成結果を履歴の先頭に追加する
    async fn push_history(
        &self,
        room_id: &RoomId,
        entry: HistoryEntry,
    ) -> Result<HistoryUpdate, RepositoryError>;

    /// 存在するルーム数
    async fn count_rooms(&self) -> usize;
}

/// Connection Repository trait（Connection Registry）
///
/// ライブな接続ごとに「誰で、どのルームにいるか」を保持する。
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 接続を登録
    async fn register(&self, connection: Connection);

    /// 接続を取得
    async fn get(&self, connection_id: &ConnectionId) -> Option<Connection>;

    /// 参加中のルームと表示名を記録
    async fn assign_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        display_name: DisplayName,
    ) -> Result<(), RepositoryError>;

    /// 参加中のルームをクリア（表示名は残す）
    async fn clear_room(&self, connection_id: &ConnectionId);

    /// 接続を削除して最後の状態を返す
    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Connection>;

    /// 登録中の接続数
    async fn count(&self) -> usize;
}
