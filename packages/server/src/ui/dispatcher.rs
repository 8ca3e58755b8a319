//! Broadcast Router: routes each inbound client event to its use case.
//!
//! Every error is handled here. Client-visible failures (join rejection,
//! generation status) are already pushed by the use cases; everything else is
//! logged and dropped. Nothing a client sends can tear the connection down.

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, ConnectionRepository, DisplayName},
    infrastructure::dto::websocket::{ClientEvent, GeneratePayload},
    usecase::{
        CreateRoomUseCase, GenerateError, GenerationCoordinator, JoinRoomUseCase,
        PromptLockUseCase, RelayUseCase,
    },
};

pub struct EventDispatcher {
    connections: Arc<dyn ConnectionRepository>,
    create_room: Arc<CreateRoomUseCase>,
    join_room: Arc<JoinRoomUseCase>,
    prompt_lock: Arc<PromptLockUseCase>,
    relay: Arc<RelayUseCase>,
    generation: Arc<GenerationCoordinator>,
}

impl EventDispatcher {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        create_room: Arc<CreateRoomUseCase>,
        join_room: Arc<JoinRoomUseCase>,
        prompt_lock: Arc<PromptLockUseCase>,
        relay: Arc<RelayUseCase>,
        generation: Arc<GenerationCoordinator>,
    ) -> Self {
        Self {
            connections,
            create_room,
            join_room,
            prompt_lock,
            relay,
            generation,
        }
    }

    /// Handle one text frame from `sender`
    pub async fn dispatch(&self, sender: &ConnectionId, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping malformed event from '{}': {}", sender, e);
                return;
            }
        };
        tracing::debug!("Received '{}' from '{}'", event.name(), sender);

        match event {
            ClientEvent::CreateRoom(_) => {
                if let Err(e) = self.create_room.execute(sender).await {
                    tracing::error!("Failed to create room for '{}': {}", sender, e);
                }
            }
            ClientEvent::JoinRoom(payload) => {
                let (room, user) = payload.into_parts();
                // rejection is pushed to the sender by the use case
                let _ = self.join_room.execute(sender, room, user).await;
            }
            ClientEvent::StartPromptEdit(payload) => {
                if let Err(e) = self.prompt_lock.acquire(sender, &payload.room).await {
                    tracing::warn!("Ignoring start_prompt_edit from '{}': {}", sender, e);
                }
            }
            ClientEvent::StopPromptEdit(payload) => {
                if let Err(e) = self.prompt_lock.release(sender, &payload.room).await {
                    tracing::warn!("Ignoring stop_prompt_edit from '{}': {}", sender, e);
                }
            }
            ClientEvent::SyncPrompt(payload) => {
                if let Err(e) = self
                    .relay
                    .sync_prompt(sender, &payload.room, payload.text)
                    .await
                {
                    tracing::warn!("Ignoring sync_prompt from '{}': {}", sender, e);
                }
            }
            ClientEvent::SendMessage(payload) => {
                let room = payload.room.clone();
                if let Err(e) = self
                    .relay
                    .send_message(sender, &room, payload.into_value())
                    .await
                {
                    tracing::warn!("Ignoring send_message from '{}': {}", sender, e);
                }
            }
            ClientEvent::Typing(payload) => {
                let room = payload.room.clone();
                if let Err(e) = self.relay.typing(sender, &room, payload.into_value()).await {
                    tracing::warn!("Ignoring typing from '{}': {}", sender, e);
                }
            }
            ClientEvent::CollaborativeGenerate(payload) => {
                self.spawn_generation(sender, payload).await;
            }
        }
    }

    /// Generation runs in its own task so the sender's socket keeps being served
    async fn spawn_generation(&self, sender: &ConnectionId, payload: GeneratePayload) {
        let author = self.resolve_author(sender, payload.user).await;
        let generation = self.generation.clone();
        let sender = sender.clone();

        tokio::spawn(async move {
            match generation
                .execute(&payload.room, payload.prompt, author)
                .await
            {
                Ok(entry) => tracing::debug!(
                    "Generation requested by '{}' stored as '{}'",
                    sender,
                    entry.storage_handle
                ),
                Err(GenerateError::RoomNotFound(room)) => {
                    tracing::debug!("Dropping generation for unknown room '{}'", room)
                }
                Err(GenerateError::InvalidPrompt(e)) => {
                    tracing::warn!("Dropping generation from '{}': {}", sender, e)
                }
                Err(e) => tracing::debug!("Generation requested by '{}' failed: {}", sender, e),
            }
        });
    }

    /// Payload name first, then the name the connection joined with
    async fn resolve_author(&self, sender: &ConnectionId, user: Option<String>) -> DisplayName {
        if let Some(name) = user.and_then(|u| DisplayName::new(u).ok())
            && name != DisplayName::guest()
        {
            return name;
        }

        self.connections
            .get(sender)
            .await
            .and_then(|c| c.display_name)
            .unwrap_or_else(DisplayName::guest)
    }
}
