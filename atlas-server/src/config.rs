use std::env;
use std::time::Duration;

use atlas_core::CleanupPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub countries_file: String,
    pub max_players_per_room: usize,
    pub win_grace_seconds: u64,
    pub cleanup_delay_seconds: u64,
    pub max_room_age_minutes: u64,
    pub connection_timeout_seconds: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            countries_file: env::var("COUNTRIES_FILE")
                .unwrap_or_else(|_| "./data/countries.geo.json".to_string()),
            max_players_per_room: env::var("MAX_PLAYERS_PER_ROOM")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("Invalid MAX_PLAYERS_PER_ROOM"),
            win_grace_seconds: env::var("WIN_GRACE_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid WIN_GRACE_SECONDS"),
            cleanup_delay_seconds: env::var("CLEANUP_DELAY_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("Invalid CLEANUP_DELAY_SECONDS"),
            max_room_age_minutes: env::var("MAX_ROOM_AGE_MINUTES")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("Invalid MAX_ROOM_AGE_MINUTES"),
            connection_timeout_seconds: env::var("CONNECTION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid CONNECTION_TIMEOUT_SECONDS"),
        }
    }

    pub fn cleanup_policy(&self) -> CleanupPolicy {
        CleanupPolicy::new(
            Duration::from_secs(self.win_grace_seconds),
            Duration::from_secs(self.cleanup_delay_seconds),
            Duration::from_secs(self.max_room_age_minutes * 60),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
