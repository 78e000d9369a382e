use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{Country, GameError, Guess, LeaderboardEntry, Player, PlayerId};

/// Inbound events, validated at the gateway boundary before they reach the
/// session engine. The sender's connection id is implicit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    CreateRoom { display_name: String },
    JoinRoom { code: String, display_name: String },
    Guess { room_code: String, country: String },
    EndGame { room_code: String },
    GetLeaderboard { room_code: String },
    Heartbeat,
}

/// Outbound events. The engine names a room and an audience class; the
/// gateway resolves those to live connections.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    RoomCreated {
        code: String,
        answer: Country,
    },
    RoomJoined {
        code: String,
        players: Vec<Player>,
        guesses: Vec<Guess>,
        is_over: bool,
    },
    PlayerJoined {
        player_id: PlayerId,
        player_name: String,
        players: Vec<Player>,
    },
    PlayerLeft {
        player_id: PlayerId,
        players: Vec<Player>,
    },
    NewGuess {
        guess: Guess,
    },
    LeaderboardUpdate {
        leaderboard: Vec<LeaderboardEntry>,
    },
    GameOver {
        leaderboard: Vec<LeaderboardEntry>,
        answer: Country,
        winner: Option<String>,
        ended_by_creator: bool,
    },
    Error {
        error: GameError,
    },
}
