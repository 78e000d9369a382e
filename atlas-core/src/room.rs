use std::time::{Duration, Instant};

use atlas_types::{
    Country, GameError, Guess, LeaderboardEntry, Player, PlayerId, RoomPhase, RoomSnapshot,
};

use crate::catalog::CountryCatalog;
use crate::{feedback, geometry};

/// Result of an accepted guess.
#[derive(Debug, Clone)]
pub struct GuessOutcome {
    pub guess: Guess,
    /// True when this guess transitioned the room to game-over.
    pub became_over: bool,
}

/// One game session. All rule checks and mutations live here; the session
/// engine serializes access so each operation sees a consistent room.
#[derive(Debug)]
pub struct Room {
    code: String,
    answer: Country,
    players: Vec<Player>, // join order, which leaderboard ties rely on
    guesses: Vec<Guess>,
    phase: RoomPhase,
    created: Instant,
    created_at: String, // ISO 8601 string
}

impl Room {
    pub fn new(code: String, answer: Country) -> Self {
        Self {
            code,
            answer,
            players: Vec::new(),
            guesses: Vec::new(),
            phase: RoomPhase::Open,
            created: Instant::now(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn answer(&self) -> &Country {
        &self.answer
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == RoomPhase::Over
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn guesses(&self) -> &[Guess] {
        &self.guesses
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    /// Admit a player. Returns `Ok(true)` for a new member and `Ok(false)`
    /// for an idempotent re-join; a re-join never resets score or history.
    pub fn add_player(
        &mut self,
        id: PlayerId,
        display_name: &str,
        is_creator: bool,
        max_players: usize,
    ) -> Result<bool, GameError> {
        if self.contains_player(id) {
            return Ok(false);
        }
        if self.players.len() >= max_players {
            return Err(GameError::RoomFull {
                code: self.code.clone(),
            });
        }
        self.players.push(Player {
            id,
            display_name: display_name.to_string(),
            score: 0,
            guessed: Vec::new(),
            has_won: false,
            is_creator,
        });
        Ok(true)
    }

    /// Returns true if the player was a member.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        self.players.len() != before
    }

    /// Apply one guess. The failure ladder is checked in order and a
    /// rejected guess leaves the room untouched.
    pub fn submit_guess(
        &mut self,
        player_id: PlayerId,
        country_id: &str,
        catalog: &CountryCatalog,
        win_grace: Duration,
    ) -> Result<GuessOutcome, GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyOver);
        }
        let player_idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::UnknownPlayer)?;
        let country = catalog
            .get(country_id)
            .ok_or_else(|| GameError::InvalidCountry {
                country: country_id.to_string(),
            })?;
        if self.players[player_idx]
            .guessed
            .iter()
            .any(|c| c == &country.id)
        {
            return Err(GameError::DuplicateGuess {
                country: country.id.clone(),
            });
        }

        let proximity = geometry::proximity(country, &self.answer);
        let hint = feedback::classify(country, &self.answer);
        let guess = Guess {
            player_id,
            player_name: self.players[player_idx].display_name.clone(),
            country: country.id.clone(),
            country_name: country.name.clone(),
            hint,
            proximity,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.guesses.push(guess.clone());

        let player = &mut self.players[player_idx];
        player.score += 1;
        player.guessed.push(country.id.clone());
        if country.id == self.answer.id {
            player.has_won = true;
        }

        if self.phase == RoomPhase::Open {
            self.phase = RoomPhase::InProgress;
        }
        let became_over = self.check_game_over(win_grace);
        Ok(GuessOutcome { guess, became_over })
    }

    /// Evaluate the game-over policy: over when every player has won, or
    /// when at least one has won and the grace window since creation has
    /// elapsed. Returns true only on the transition itself.
    pub fn check_game_over(&mut self, win_grace: Duration) -> bool {
        if self.is_over() || self.players.is_empty() {
            return false;
        }
        let all_won = self.players.iter().all(|p| p.has_won);
        let any_won = self.players.iter().any(|p| p.has_won);
        if all_won || (any_won && self.elapsed() >= win_grace) {
            self.phase = RoomPhase::Over;
            return true;
        }
        false
    }

    /// Force the terminal state, regardless of win state. Idempotent:
    /// returns true only on the transition.
    pub fn force_over(&mut self) -> bool {
        if self.is_over() {
            return false;
        }
        self.phase = RoomPhase::Over;
        true
    }

    /// Recomputed from scratch on every call; winners first (fewest guesses
    /// wins among them), then the rest by current guess count. `sort_by_key`
    /// is stable, so ties keep join order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|p| LeaderboardEntry {
                player_id: p.id,
                display_name: p.display_name.clone(),
                score: p.score,
                has_won: p.has_won,
                is_creator: p.is_creator,
            })
            .collect();
        entries.sort_by_key(|e| (!e.has_won, e.score));
        entries
    }

    /// Best-placed winner, used when game-over is announced by a timer
    /// rather than by a winning guess.
    pub fn winner_name(&self) -> Option<String> {
        self.leaderboard()
            .into_iter()
            .find(|e| e.has_won)
            .map(|e| e.display_name)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            players: self.players.clone(),
            guesses: self.guesses.clone(),
            is_over: self.is_over(),
            created_at: self.created_at.clone(),
        }
    }
}
