//! Server state and dependency wiring.

use std::{sync::Arc, time::Duration};

use tsudoi_shared::time::Clock;

use crate::{
    domain::{BlobStorage, ConnectionRepository, ImageGenerator, MessagePusher, RoomRepository},
    usecase::{
        ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
        GenerationCoordinator, GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase,
        LeaveRoomUseCase, PromptLockUseCase, RelayUseCase, RoomBroadcaster,
    },
};

use super::dispatcher::EventDispatcher;

/// Implementations of the domain interfaces the server runs on
pub struct Dependencies {
    /// Room Store
    pub rooms: Arc<dyn RoomRepository>,
    /// Connection Registry
    pub connections: Arc<dyn ConnectionRepository>,
    pub message_pusher: Arc<dyn MessagePusher>,
    pub image_generator: Arc<dyn ImageGenerator>,
    pub blob_storage: Arc<dyn BlobStorage>,
    pub clock: Arc<dyn Clock>,
    /// Timeout of each external call during a generation
    pub generation_timeout: Duration,
}

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// クライアントイベントの振り分け（Broadcast Router）
    pub dispatcher: Arc<EventDispatcher>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
}

impl AppState {
    /// Build every use case on top of the given dependencies
    pub fn from_dependencies(deps: Dependencies) -> Self {
        let broadcaster = Arc::new(RoomBroadcaster::new(
            deps.rooms.clone(),
            deps.message_pusher.clone(),
        ));

        let leave_room = Arc::new(LeaveRoomUseCase::new(
            deps.rooms.clone(),
            deps.connections.clone(),
            broadcaster.clone(),
            deps.blob_storage.clone(),
        ));
        let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
            deps.connections.clone(),
            deps.message_pusher.clone(),
        ));
        let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
            leave_room.clone(),
            deps.connections.clone(),
            deps.message_pusher.clone(),
        ));
        let create_room = Arc::new(CreateRoomUseCase::new(
            deps.rooms.clone(),
            broadcaster.clone(),
        ));
        let join_room = Arc::new(JoinRoomUseCase::new(
            deps.rooms.clone(),
            deps.connections.clone(),
            broadcaster.clone(),
            leave_room,
        ));
        let prompt_lock = Arc::new(PromptLockUseCase::new(
            deps.rooms.clone(),
            deps.connections.clone(),
            broadcaster.clone(),
        ));
        let relay = Arc::new(RelayUseCase::new(deps.connections.clone(), broadcaster.clone()));
        let generation = Arc::new(GenerationCoordinator::new(
            deps.rooms.clone(),
            broadcaster,
            deps.image_generator,
            deps.blob_storage,
            deps.clock,
            deps.generation_timeout,
        ));

        let dispatcher = Arc::new(EventDispatcher::new(
            deps.connections,
            create_room,
            join_room,
            prompt_lock,
            relay,
            generation,
        ));

        Self {
            connect_participant_usecase,
            disconnect_participant_usecase,
            dispatcher,
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(deps.rooms.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(deps.rooms)),
        }
    }
}
