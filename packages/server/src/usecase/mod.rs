//! UseCase 層
//!
//! クライアントイベント 1 つにつき 1 つのユースケース。
//! ドメインのインターフェース（Repository, MessagePusher, 外部サービス）にだけ依存する。

mod connect_participant;
mod create_room;
mod disconnect_participant;
pub mod error;
mod fanout;
mod generate_image;
mod join_room;
mod leave_room;
mod membership;
mod prompt_lock;
mod relay;
mod room_query;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect_participant::ConnectParticipantUseCase;
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{
    ConnectError, CreateRoomError, DisconnectError, GenerateError, GetRoomDetailError,
    JoinRoomError, LeaveRoomError, MembershipError, PromptLockError, RelayError,
};
pub use fanout::RoomBroadcaster;
pub use generate_image::{DEFAULT_GENERATION_TIMEOUT, GenerationCoordinator};
pub use join_room::JoinRoomUseCase;
pub use leave_room::{LeaveOutcome, LeaveRoomUseCase};
pub use prompt_lock::PromptLockUseCase;
pub use relay::RelayUseCase;
pub use room_query::{GetRoomDetailUseCase, GetRoomsUseCase};
