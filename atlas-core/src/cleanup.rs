use std::time::Duration;

/// Time-driven room lifecycle knobs. The session engine schedules explicit
/// tasks from these; nothing here runs on its own.
#[derive(Debug, Clone, Copy)]
pub struct CleanupPolicy {
    /// Window after room creation during which a partial win keeps the game
    /// open so other players can finish.
    pub win_grace: Duration,
    /// How long a finished room lingers before reclamation.
    pub post_game_delay: Duration,
    /// Absolute cap on room age, win or no win.
    pub max_room_age: Duration,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            win_grace: Duration::from_secs(300),        // 5 minutes
            post_game_delay: Duration::from_secs(30),   // 30 seconds
            max_room_age: Duration::from_secs(7200),    // 2 hours
        }
    }
}

impl CleanupPolicy {
    pub fn new(win_grace: Duration, post_game_delay: Duration, max_room_age: Duration) -> Self {
        Self {
            win_grace,
            post_game_delay,
            max_room_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_product_behaviour() {
        let policy = CleanupPolicy::default();
        assert_eq!(policy.win_grace, Duration::from_secs(300));
        assert_eq!(policy.post_game_delay, Duration::from_secs(30));
        assert_eq!(policy.max_room_age, Duration::from_secs(7200));
    }
}
