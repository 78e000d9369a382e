use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, info};

use atlas_core::{CleanupPolicy, CountryCatalog, GuessOutcome};
use atlas_types::{Country, GameError, LeaderboardEntry, PlayerId, RoomSnapshot, ServerMessage};

use crate::gateway::Gateway;
use crate::room_store::{RoomSlot, RoomStore};

/// All game-rule logic. Every mutation of a room funnels through here: one
/// logical operation takes the room's lock for its duration and releases it
/// before anything is handed to the gateway, so delivery never happens
/// inside a room's critical section.
///
/// Timer tasks hold a `Weak` reference back to the engine; a timer that
/// outlives the process shutdown simply finds nothing to upgrade.
pub struct SessionEngine {
    weak: Weak<SessionEngine>,
    store: RoomStore,
    catalog: Arc<CountryCatalog>,
    gateway: Arc<dyn Gateway>,
    policy: CleanupPolicy,
    max_players: usize,
}

impl SessionEngine {
    /// The engine takes sole ownership of the store; nothing else may
    /// create or delete rooms once the process is wired up.
    pub fn new(
        store: RoomStore,
        catalog: Arc<CountryCatalog>,
        gateway: Arc<dyn Gateway>,
        policy: CleanupPolicy,
        max_players: usize,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            store,
            catalog,
            gateway,
            policy,
            max_players,
        })
    }

    /// Create a room with a uniformly random answer and admit the creator
    /// as its first player. The room's absolute-age expiry is scheduled
    /// here; it fires even if every client goes silent.
    pub async fn create_room(
        &self,
        creator_id: PlayerId,
        display_name: &str,
    ) -> Result<(String, Country), GameError> {
        let answer = self.catalog.random().clone();
        let (code, slot) = self.store.create(answer.clone())?;
        {
            let mut room = slot.room.lock().await;
            // The room is brand new, so capacity cannot reject the creator
            room.add_player(creator_id, display_name, true, self.max_players)?;
        }
        self.schedule_expiry(&code, &slot).await;
        info!(code = %code, answer = %answer.name, player = %creator_id, "room created");
        Ok((code, answer))
    }

    /// Join an existing room. Creation-on-join is deliberately not
    /// supported; an unknown code is the caller's error.
    pub async fn join_room(
        &self,
        code: &str,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<RoomSnapshot, GameError> {
        let slot = self.get_slot(code)?;
        let (snapshot, newly_joined, players) = {
            let mut room = slot.room.lock().await;
            let newly_joined = room.add_player(player_id, display_name, false, self.max_players)?;
            (room.snapshot(), newly_joined, room.players().to_vec())
        };
        if newly_joined {
            info!(code = %code, player = %player_id, "player joined room");
            self.gateway
                .send_to_room_except(
                    code,
                    player_id,
                    ServerMessage::PlayerJoined {
                        player_id,
                        player_name: display_name.to_string(),
                        players,
                    },
                )
                .await;
        }
        Ok(snapshot)
    }

    /// Apply one guess and broadcast its consequences. Returns the recorded
    /// guess plus whether it ended the game.
    pub async fn submit_guess(
        &self,
        code: &str,
        player_id: PlayerId,
        country_id: &str,
    ) -> Result<GuessOutcome, GameError> {
        let slot = self.get_slot(code)?;
        let (outcome, leaderboard, over, grace_remaining) = {
            let mut room = slot.room.lock().await;
            let had_winner = room.players().iter().any(|p| p.has_won);
            let outcome =
                room.submit_guess(player_id, country_id, &self.catalog, self.policy.win_grace)?;
            let leaderboard = room.leaderboard();
            let over = outcome.became_over.then(|| {
                let winner = (outcome.guess.country == room.answer().id)
                    .then(|| outcome.guess.player_name.clone());
                (room.answer().clone(), winner)
            });
            // First win that doesn't end the game starts the grace clock
            let grace_remaining = (!had_winner
                && !room.is_over()
                && room.players().iter().any(|p| p.has_won))
            .then(|| self.policy.win_grace.saturating_sub(room.elapsed()));
            (outcome, leaderboard, over, grace_remaining)
        };

        self.gateway
            .send_to_room(
                code,
                ServerMessage::NewGuess {
                    guess: outcome.guess.clone(),
                },
            )
            .await;
        self.gateway
            .send_to_room(
                code,
                ServerMessage::LeaderboardUpdate {
                    leaderboard: leaderboard.clone(),
                },
            )
            .await;

        if let Some((answer, winner)) = over {
            info!(code = %code, "game over");
            self.gateway
                .send_to_room(
                    code,
                    ServerMessage::GameOver {
                        leaderboard,
                        answer,
                        winner,
                        ended_by_creator: false,
                    },
                )
                .await;
            self.schedule_cleanup(code, &slot).await;
        } else if let Some(remaining) = grace_remaining {
            self.schedule_grace_check(code, &slot, remaining).await;
        }

        Ok(outcome)
    }

    /// Force the game over. Creator-only.
    pub async fn end_game(&self, code: &str, requester_id: PlayerId) -> Result<(), GameError> {
        let slot = self.get_slot(code)?;
        let payload = {
            let mut room = slot.room.lock().await;
            let requester = room
                .players()
                .iter()
                .find(|p| p.id == requester_id)
                .ok_or(GameError::UnknownPlayer)?;
            if !requester.is_creator {
                return Err(GameError::NotCreator);
            }
            room.force_over()
                .then(|| (room.leaderboard(), room.answer().clone()))
        };

        // force_over is idempotent; a second end never re-broadcasts
        if let Some((leaderboard, answer)) = payload {
            info!(code = %code, player = %requester_id, "game ended by creator");
            self.gateway
                .send_to_room(
                    code,
                    ServerMessage::GameOver {
                        leaderboard,
                        answer,
                        winner: None,
                        ended_by_creator: true,
                    },
                )
                .await;
            self.schedule_cleanup(code, &slot).await;
        }
        Ok(())
    }

    /// Remove a player; reclaims the room immediately when it empties.
    /// Swallows "room already gone" — disconnect cleanup must never fail.
    pub async fn remove_player(&self, code: &str, player_id: PlayerId) {
        let Some(slot) = self.store.get(code) else {
            return;
        };
        let remaining = {
            let mut room = slot.room.lock().await;
            if !room.remove_player(player_id) {
                return;
            }
            if room.is_empty() {
                None
            } else {
                Some(room.players().to_vec())
            }
        };
        match remaining {
            None => {
                self.store.remove(code).await;
                info!(code = %code, "room reclaimed, last player left");
            }
            Some(players) => {
                self.gateway
                    .send_to_room_except(
                        code,
                        player_id,
                        ServerMessage::PlayerLeft { player_id, players },
                    )
                    .await;
            }
        }
    }

    /// Disconnect handling: drop the player from every room they are in.
    pub async fn disconnect(&self, player_id: PlayerId) {
        for code in self.store.codes() {
            self.remove_player(&code, player_id).await;
        }
    }

    /// Read-only projection, recomputed on every call.
    pub async fn leaderboard(&self, code: &str) -> Result<Vec<LeaderboardEntry>, GameError> {
        let slot = self.get_slot(code)?;
        let room = slot.room.lock().await;
        Ok(room.leaderboard())
    }

    pub async fn room_snapshot(&self, code: &str) -> Option<RoomSnapshot> {
        let slot = self.store.get(code)?;
        let room = slot.room.lock().await;
        Some(room.snapshot())
    }

    pub fn active_rooms(&self) -> usize {
        self.store.len()
    }

    fn get_slot(&self, code: &str) -> Result<Arc<RoomSlot>, GameError> {
        self.store.get(code).ok_or_else(|| GameError::RoomNotFound {
            code: code.to_string(),
        })
    }

    /// Absolute room-age cap, scheduled at creation.
    async fn schedule_expiry(&self, code: &str, slot: &Arc<RoomSlot>) {
        let weak = self.weak.clone();
        let code = code.to_string();
        let delay = self.policy.max_room_age;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(engine) = weak.upgrade() else {
                return;
            };
            if engine.store.remove(&code).await.is_some() {
                info!(code = %code, "room reclaimed at maximum age");
            }
        });
        slot.timers.lock().await.expiry = Some(task.abort_handle());
    }

    /// Deadline for the partial-win ending: one winner plus an elapsed
    /// grace window. Scheduled once, on the first win; re-checks the policy
    /// under the room lock when it fires.
    async fn schedule_grace_check(&self, code: &str, slot: &Arc<RoomSlot>, remaining: Duration) {
        let mut timers = slot.timers.lock().await;
        if timers.grace.is_some() {
            return;
        }
        let weak = self.weak.clone();
        let code = code.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let Some(engine) = weak.upgrade() else {
                return;
            };
            engine.enforce_grace_deadline(&code).await;
        });
        timers.grace = Some(task.abort_handle());
    }

    async fn enforce_grace_deadline(&self, code: &str) {
        let Some(slot) = self.store.get(code) else {
            return;
        };
        let payload = {
            let mut room = slot.room.lock().await;
            if !room.check_game_over(self.policy.win_grace) {
                return;
            }
            (room.leaderboard(), room.answer().clone(), room.winner_name())
        };
        let (leaderboard, answer, winner) = payload;
        info!(code = %code, "game over, win grace window elapsed");
        self.gateway
            .send_to_room(
                code,
                ServerMessage::GameOver {
                    leaderboard,
                    answer,
                    winner,
                    ended_by_creator: false,
                },
            )
            .await;
        self.schedule_cleanup(code, &slot).await;
    }

    /// Post-game linger before reclamation. Scheduling twice is a no-op, so
    /// two transitions into game-over in the same tick cannot double-fire.
    async fn schedule_cleanup(&self, code: &str, slot: &Arc<RoomSlot>) {
        let mut timers = slot.timers.lock().await;
        if timers.cleanup.is_some() {
            return;
        }
        // The game is decided; a pending grace check has nothing left to do
        if let Some(grace) = timers.grace.take() {
            grace.abort();
        }
        let weak = self.weak.clone();
        let code = code.to_string();
        let delay = self.policy.post_game_delay;
        let task_code = code.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(engine) = weak.upgrade() else {
                return;
            };
            if engine.store.remove(&task_code).await.is_some() {
                info!(code = %task_code, "room reclaimed after game over");
            }
        });
        timers.cleanup = Some(task.abort_handle());
        debug!(code = %code, delay_secs = delay.as_secs(), "cleanup scheduled");
    }
}
