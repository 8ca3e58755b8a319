//! UseCase: ルームの参照（HTTP API 用）

use std::sync::Arc;

use crate::domain::{RepositoryError, Room, RoomId, RoomRepository};

use super::error::GetRoomDetailError;

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    pub async fn execute(&self) -> Vec<Room> {
        self.rooms.list_rooms().await
    }
}

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    pub async fn execute(&self, room_id: String) -> Result<Room, GetRoomDetailError> {
        let id = RoomId::new(room_id.clone())
            .map_err(|_| GetRoomDetailError::RoomNotFound(room_id))?;

        self.rooms.get_room(&id).await.map_err(|e| match e {
            RepositoryError::RoomNotFound(id) => GetRoomDetailError::RoomNotFound(id),
            other => GetRoomDetailError::Repository(other),
        })
    }
}
