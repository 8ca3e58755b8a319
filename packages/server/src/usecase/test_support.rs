//! UseCase テスト用のヘルパー

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    domain::{
        Connection, ConnectionId, ConnectionRepository, DisplayName, ImageUrl, MessagePushError,
        MessagePusher, PusherChannel, RoomEvent, RoomId, StorageHandle, StoredImage, Timestamp,
    },
    infrastructure::repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
};

use super::RoomBroadcaster;

/// 送信したイベントを宛先ごとに記録する MessagePusher
#[derive(Default)]
pub struct RecordingPusher {
    deliveries: Mutex<Vec<(ConnectionId, RoomEvent)>>,
    registered: Mutex<Vec<ConnectionId>>,
}

impl RecordingPusher {
    /// 指定した接続に届いたイベント（送信順）
    pub fn events_for(&self, connection_id: &ConnectionId) -> Vec<RoomEvent> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.registered.lock().unwrap().contains(connection_id)
    }

    pub fn clear(&self) {
        self.deliveries.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessagePusher for RecordingPusher {
    async fn register_client(&self, connection_id: ConnectionId, _sender: PusherChannel) {
        self.registered.lock().unwrap().push(connection_id);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        self.registered.lock().unwrap().retain(|id| id != connection_id);
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &RoomEvent,
    ) -> Result<(), MessagePushError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((connection_id.clone(), event.clone()));
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RoomEvent,
    ) -> Result<(), MessagePushError> {
        let mut deliveries = self.deliveries.lock().unwrap();
        for target in targets {
            deliveries.push((target, event.clone()));
        }
        Ok(())
    }
}

/// リポジトリと RecordingPusher をまとめたテスト環境
pub struct Fixture {
    pub rooms: Arc<InMemoryRoomRepository>,
    pub connections: Arc<InMemoryConnectionRepository>,
    pub pusher: Arc<RecordingPusher>,
    pub broadcaster: Arc<RoomBroadcaster>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_rooms(InMemoryRoomRepository::new())
    }

    pub fn with_rooms(rooms: InMemoryRoomRepository) -> Self {
        let rooms = Arc::new(rooms);
        let pusher = Arc::new(RecordingPusher::default());
        let broadcaster = Arc::new(RoomBroadcaster::new(rooms.clone(), pusher.clone()));
        Self {
            rooms,
            connections: Arc::new(InMemoryConnectionRepository::new()),
            pusher,
            broadcaster,
        }
    }

    /// 接続を登録して ID を返す
    pub async fn connect(&self, id: &str) -> ConnectionId {
        let connection_id = ConnectionId::new(id.to_string()).unwrap();
        self.connections
            .register(Connection::new(connection_id.clone(), Timestamp::new(0)))
            .await;
        connection_id
    }
}

pub fn display_name(name: &str) -> DisplayName {
    DisplayName::new(name.to_string()).unwrap()
}

pub fn room_id(value: &str) -> RoomId {
    RoomId::new(value.to_string()).unwrap()
}

/// n 番目のアップロード結果
pub fn stored_image(n: usize) -> StoredImage {
    StoredImage {
        url: ImageUrl::new(format!("https://img.example/{}.png", n)).unwrap(),
        handle: StorageHandle::new(format!("handle-{}", n)).unwrap(),
    }
}
