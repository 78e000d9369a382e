use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use atlas_types::{PlayerId, ServerMessage};

use crate::gateway::Gateway;

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: PlayerId,
    pub display_name: Option<String>,
    pub room_code: Option<String>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: PlayerId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            display_name: None,
            room_code: None,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Tracks live connections and routes engine output to them. Implements
/// the engine's `Gateway` seam: the engine names a room, this resolves it
/// to member connections.
pub struct ConnectionManager {
    connections: RwLock<HashMap<PlayerId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: PlayerId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (connection, receiver) = Connection::new(id);
        let mut connections = self.connections.write().await;
        connections.insert(id, connection);
        receiver
    }

    pub async fn remove_connection(&self, id: PlayerId) {
        let mut connections = self.connections.write().await;
        connections.remove(&id);
    }

    pub async fn get_connection(&self, id: PlayerId) -> Option<Connection> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    pub async fn update_activity(&self, id: PlayerId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn set_connection_room(&self, id: PlayerId, room_code: Option<String>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.room_code = room_code;
        }
    }

    pub async fn set_display_name(&self, id: PlayerId, display_name: &str) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.display_name = Some(display_name.to_string());
        }
    }

    pub async fn send_to_connection(
        &self,
        id: PlayerId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    pub async fn connections_in_room(&self, code: &str) -> Vec<PlayerId> {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|conn| conn.room_code.as_deref() == Some(code))
            .map(|conn| conn.id)
            .collect()
    }

    pub async fn cleanup_inactive_connections(&self, timeout: Duration) {
        let inactive: Vec<PlayerId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        for id in inactive {
            tracing::info!(player = %id, "removing inactive connection");
            self.remove_connection(id).await;
        }
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for ConnectionManager {
    async fn send_to_player(&self, player_id: PlayerId, message: ServerMessage) {
        if let Err(e) = self.send_to_connection(player_id, message).await {
            tracing::debug!(player = %player_id, error = %e, "dropped outbound message");
        }
    }

    async fn send_to_room(&self, code: &str, message: ServerMessage) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if connection.room_code.as_deref() == Some(code) {
                let _ = connection.send_message(message.clone());
            }
        }
    }

    async fn send_to_room_except(&self, code: &str, except: PlayerId, message: ServerMessage) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if connection.id != except && connection.room_code.as_deref() == Some(code) {
                let _ = connection.send_message(message.clone());
            }
        }
    }
}
