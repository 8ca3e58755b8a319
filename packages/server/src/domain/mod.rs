//! ドメイン層
//!
//! エンティティ・値オブジェクト・ドメインイベントと、
//! ドメイン層が必要とするインターフェース（Repository, MessagePusher, 外部サービス）を定義します。

pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod message_pusher;
pub mod repository;
pub mod service;
pub mod value_object;

pub use entity::{
    Connection, DEFAULT_HISTORY_CAPACITY, DEFAULT_MEMBER_CAPACITY, HistoryEntry, Member, Room,
};
pub use error::{
    GenerationError, MessagePushError, RepositoryError, RoomError, StorageError, ValueObjectError,
};
pub use event::{GenerationStatus, RoomEvent};
pub use factory::RoomIdFactory;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{ConnectionRepository, Departure, HistoryUpdate, RoomRepository, Transfer};
pub use service::{BlobStorage, ImageGenerator, StoredImage};
pub use value_object::{
    ConnectionId, DisplayName, ImageUrl, Prompt, RoomId, StorageHandle, Timestamp,
};
