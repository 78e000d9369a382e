use std::sync::Arc;

use tracing::{debug, info};

use atlas_types::{ClientMessage, GameError, PlayerId, ServerMessage};

use crate::session::SessionEngine;
use crate::websocket::connection::ConnectionManager;

/// Per-connection dispatcher: maps validated inbound events to session
/// engine calls. Requester-addressed replies are sent from here; room-wide
/// broadcasts are the engine's job.
#[derive(Clone)]
pub struct MessageHandler {
    player_id: PlayerId,
    connection_manager: Arc<ConnectionManager>,
    engine: Arc<SessionEngine>,
}

impl MessageHandler {
    pub fn new(
        player_id: PlayerId,
        connection_manager: Arc<ConnectionManager>,
        engine: Arc<SessionEngine>,
    ) -> Self {
        Self {
            player_id,
            connection_manager,
            engine,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager.update_activity(self.player_id).await;

        match message {
            ClientMessage::CreateRoom { display_name } => {
                self.handle_create_room(display_name).await
            }
            ClientMessage::JoinRoom { code, display_name } => {
                self.handle_join_room(code, display_name).await
            }
            ClientMessage::Guess { room_code, country } => {
                self.handle_guess(room_code, country).await
            }
            ClientMessage::EndGame { room_code } => self.handle_end_game(room_code).await,
            ClientMessage::GetLeaderboard { room_code } => {
                self.handle_get_leaderboard(room_code).await
            }
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    pub async fn handle_disconnect(&self) {
        info!(player = %self.player_id, "handling disconnect");
        self.engine.disconnect(self.player_id).await;
    }

    async fn handle_create_room(&self, display_name: String) -> Result<(), String> {
        match self.engine.create_room(self.player_id, &display_name).await {
            Ok((code, answer)) => {
                self.connection_manager
                    .set_display_name(self.player_id, &display_name)
                    .await;
                self.connection_manager
                    .set_connection_room(self.player_id, Some(code.clone()))
                    .await;
                self.send_message(ServerMessage::RoomCreated { code, answer })
                    .await
            }
            Err(error) => self.send_game_error(error).await,
        }
    }

    async fn handle_join_room(&self, code: String, display_name: String) -> Result<(), String> {
        // Membership must be visible to the gateway before the snapshot is
        // delivered, so later room broadcasts reach this connection
        let previous_room = self
            .connection_manager
            .get_connection(self.player_id)
            .await
            .and_then(|conn| conn.room_code);
        self.connection_manager
            .set_display_name(self.player_id, &display_name)
            .await;
        self.connection_manager
            .set_connection_room(self.player_id, Some(code.clone()))
            .await;

        match self
            .engine
            .join_room(&code, self.player_id, &display_name)
            .await
        {
            Ok(snapshot) => {
                self.send_message(ServerMessage::RoomJoined {
                    code: snapshot.code,
                    players: snapshot.players,
                    guesses: snapshot.guesses,
                    is_over: snapshot.is_over,
                })
                .await
            }
            Err(error) => {
                self.connection_manager
                    .set_connection_room(self.player_id, previous_room)
                    .await;
                self.send_game_error(error).await
            }
        }
    }

    async fn handle_guess(&self, room_code: String, country: String) -> Result<(), String> {
        // The accepted guess reaches everyone (including the requester) as a
        // room broadcast; only failures are answered directly
        match self
            .engine
            .submit_guess(&room_code, self.player_id, &country)
            .await
        {
            Ok(_) => Ok(()),
            Err(error) => self.send_game_error(error).await,
        }
    }

    async fn handle_end_game(&self, room_code: String) -> Result<(), String> {
        match self.engine.end_game(&room_code, self.player_id).await {
            Ok(()) => Ok(()),
            Err(error) => self.send_game_error(error).await,
        }
    }

    async fn handle_get_leaderboard(&self, room_code: String) -> Result<(), String> {
        match self.engine.leaderboard(&room_code).await {
            Ok(leaderboard) => {
                self.send_message(ServerMessage::LeaderboardUpdate { leaderboard })
                    .await
            }
            Err(error) => self.send_game_error(error).await,
        }
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.player_id, message)
            .await
    }

    async fn send_game_error(&self, error: GameError) -> Result<(), String> {
        debug!(player = %self.player_id, error = %error, "rejected client operation");
        self.send_message(ServerMessage::Error { error }).await
    }
}
