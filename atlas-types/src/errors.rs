use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Every way a game-rule operation can be rejected. All variants are
/// recoverable and reported to the requester only; none of them leaves the
/// room partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameError {
    #[error("room {code} not found")]
    RoomNotFound { code: String },
    #[error("player is not a member of this room")]
    UnknownPlayer,
    #[error("unknown country {country}")]
    InvalidCountry { country: String },
    #[error("{country} has already been guessed")]
    DuplicateGuess { country: String },
    #[error("the game is already over")]
    GameAlreadyOver,
    #[error("only the room creator can end the game")]
    NotCreator,
    #[error("room {code} is full")]
    RoomFull { code: String },
    #[error("no free room code could be generated")]
    CodeGenerationExhausted,
}
