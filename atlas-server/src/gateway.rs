use async_trait::async_trait;

use atlas_types::{PlayerId, ServerMessage};

/// Delivery seam between the session engine and the transport. The engine
/// only ever names a room code and an audience class; implementations
/// resolve those to live connections. Delivery is best-effort: a closed
/// connection is the transport's problem, never the engine's.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_to_player(&self, player_id: PlayerId, message: ServerMessage);
    async fn send_to_room(&self, code: &str, message: ServerMessage);
    async fn send_to_room_except(&self, code: &str, except: PlayerId, message: ServerMessage);
}
