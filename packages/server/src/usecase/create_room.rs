//! UseCase: ルーム作成
//!
//! 空のルームを作成し、ルーム ID を作成者にだけ返す。
//! 作成者は続けて `join_room` を送って参加する（作成だけでは参加しない）。

use std::sync::Arc;

use tsudoi_shared::time::get_utc_timestamp;

use crate::domain::{ConnectionId, RoomEvent, RoomId, RoomRepository, Timestamp};

use super::{RoomBroadcaster, error::CreateRoomError};

pub struct CreateRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl CreateRoomUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self { rooms, broadcaster }
    }

    pub async fn execute(&self, requester: &ConnectionId) -> Result<RoomId, CreateRoomError> {
        let room_id = self
            .rooms
            .create_room(Timestamp::new(get_utc_timestamp()))
            .await?;
        tracing::info!("Room '{}' created by '{}'", room_id, requester);

        self.broadcaster
            .to_connection(
                requester,
                &RoomEvent::RoomCreated {
                    room_id: room_id.clone(),
                },
            )
            .await;

        Ok(room_id)
    }
}
