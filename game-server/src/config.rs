use std::env;

/// Server configuration from environment variables. Grace periods are
/// phase-dependent: how long a disconnected player's seat survives before
/// removal.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub countdown_seconds: u32,
    pub selection_deadline_seconds: u64,
    pub grace_waiting_seconds: u64,
    pub grace_playing_seconds: u64,
    pub grace_finished_seconds: u64,
    pub grace_solo_seconds: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            countdown_seconds: env::var("COUNTDOWN_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("Invalid COUNTDOWN_SECONDS"),
            selection_deadline_seconds: env::var("SELECTION_DEADLINE_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("Invalid SELECTION_DEADLINE_SECONDS"),
            grace_waiting_seconds: env::var("GRACE_WAITING_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("Invalid GRACE_WAITING_SECONDS"),
            grace_playing_seconds: env::var("GRACE_PLAYING_SECONDS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("Invalid GRACE_PLAYING_SECONDS"),
            grace_finished_seconds: env::var("GRACE_FINISHED_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid GRACE_FINISHED_SECONDS"),
            grace_solo_seconds: env::var("GRACE_SOLO_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .expect("Invalid GRACE_SOLO_SECONDS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
