//! InMemory Connection Repository 実装（Connection Registry）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, DisplayName, RepositoryError, RoomId,
};

/// インメモリ Connection Repository 実装
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, connection: Connection) {
        let mut connections = self.connections.lock().await;
        tracing::debug!("Connection '{}' registered", connection.id);
        connections.insert(connection.id.clone(), connection);
    }

    async fn get(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let connections = self.connections.lock().await;
        connections.get(connection_id).cloned()
    }

    async fn assign_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        display_name: DisplayName,
    ) -> Result<(), RepositoryError> {
        let mut connections = self.connections.lock().await;
        let connection = connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        connection.current_room = Some(room_id);
        connection.display_name = Some(display_name);
        Ok(())
    }

    async fn clear_room(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.lock().await;
        if let Some(connection) = connections.get_mut(connection_id) {
            connection.current_room = None;
        }
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let mut connections = self.connections.lock().await;
        let removed = connections.remove(connection_id);
        if removed.is_some() {
            tracing::debug!("Connection '{}' unregistered", connection_id);
        }
        removed
    }

    async fn count(&self) -> usize {
        self.connections.lock().await.len()
    }
}
