use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::country::CountryId;

/// Connection-scoped player identifier. A player's identity lives exactly as
/// long as their WebSocket connection.
pub type PlayerId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub score: u32,
    pub guessed: Vec<CountryId>,
    pub has_won: bool,
    pub is_creator: bool,
}

/// An accepted guess. Append-only: once recorded it is never mutated or
/// removed, so the sequence doubles as the room's authoritative history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Guess {
    pub player_id: PlayerId,
    pub player_name: String,
    pub country: CountryId,
    pub country_name: String,
    pub hint: Hint,
    pub proximity: f64,
    pub timestamp: String, // ISO 8601 string
}

/// Discrete feedback tier shown for a guess, derived from proximity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Hint {
    Correct,
    Boiling,
    Hot,
    Warm,
    Cool,
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoomPhase {
    Open,       // no guesses yet
    InProgress, // at least one guess submitted
    Over,       // terminal, no further guesses accepted
}

/// What a joining client sees: everything about the room except the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomSnapshot {
    pub code: String,
    pub players: Vec<Player>,
    pub guesses: Vec<Guess>,
    pub is_over: bool,
    pub created_at: String, // ISO 8601 string
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
    pub has_won: bool,
    pub is_creator: bool,
}
