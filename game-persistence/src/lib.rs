pub mod connection;
pub mod entities;

use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use tracing::warn;
use uuid::Uuid;

use entities::{daily_completions, game_results, games, guesses, prelude::*};
use game_types::{FinalStanding, GameMode, LetterStatus, WordMode};

/// Metadata captured when a persistence record is opened at game start.
#[derive(Debug, Clone)]
pub struct GameRecordMeta {
    pub room_code: String,
    pub game_mode: GameMode,
    pub word_mode: WordMode,
    pub word: Option<String>,
    pub player_count: u32,
}

/// One player's daily-challenge completion, written at game end.
#[derive(Debug, Clone)]
pub struct DailyCompletion {
    pub email: String,
    pub won: bool,
    pub guess_count: u32,
    pub solve_time_ms: Option<u64>,
}

/// Best-effort statistics sink. Every write logs failures and returns
/// normally; with no backing database every call is a silent no-op. Nothing
/// here may ever gate game progression.
pub struct StatsStore {
    db: Option<DatabaseConnection>,
}

impl StatsStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Some(db) }
    }

    pub fn disabled() -> Self {
        Self { db: None }
    }

    /// Connect using `DATABASE_URL`. Unset means stats are off; a failed
    /// connection degrades to off rather than failing startup.
    pub async fn from_env() -> Self {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            tracing::info!("DATABASE_URL not set, stats persistence disabled");
            return Self::disabled();
        };
        match connection::connect_and_migrate(&url).await {
            Ok(db) => Self::new(db),
            Err(e) => {
                warn!("Failed to connect stats database, continuing without: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.db.is_some()
    }

    /// Open a game record; `None` when stats are off or the insert failed.
    pub async fn create_game(&self, meta: GameRecordMeta) -> Option<Uuid> {
        let db = self.db.as_ref()?;
        let id = Uuid::new_v4();
        let model = games::ActiveModel {
            id: Set(id),
            room_code: Set(meta.room_code),
            game_mode: Set(mode_label(meta.game_mode).to_string()),
            word_mode: Set(word_mode_label(meta.word_mode).to_string()),
            word: Set(meta.word),
            player_count: Set(meta.player_count as i32),
            started_at: Set(chrono::Utc::now().into()),
            ended_at: Set(None),
        };

        match Games::insert(model).exec(db).await {
            Ok(_) => Some(id),
            Err(e) => {
                warn!("Failed to create game record: {}", e);
                None
            }
        }
    }

    pub async fn save_guess(
        &self,
        game_id: Uuid,
        player_email: Option<String>,
        guess_number: u32,
        word: String,
        elapsed_ms: u64,
        letters: &[LetterStatus],
    ) {
        let Some(db) = self.db.as_ref() else { return };
        let model = guesses::ActiveModel {
            game_id: Set(game_id),
            player_email: Set(player_email),
            guess_number: Set(guess_number as i32),
            word: Set(word),
            elapsed_ms: Set(elapsed_ms as i64),
            letter_results: Set(encode_letters(letters)),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        if let Err(e) = Guesses::insert(model).exec(db).await {
            warn!("Failed to save guess for game {}: {}", game_id, e);
        }
    }

    pub async fn save_game_results(
        &self,
        game_id: Uuid,
        word: Option<String>,
        results: &[(FinalStanding, Option<String>)],
    ) {
        let Some(db) = self.db.as_ref() else { return };

        let ended = games::ActiveModel {
            id: Set(game_id),
            ended_at: Set(Some(chrono::Utc::now().into())),
            word: Set(word),
            ..Default::default()
        };
        if let Err(e) = Games::update(ended).exec(db).await {
            warn!("Failed to close game record {}: {}", game_id, e);
        }

        for (standing, email) in results {
            let model = game_results::ActiveModel {
                game_id: Set(game_id),
                player_name: Set(standing.name.clone()),
                player_email: Set(email.clone()),
                won: Set(standing.won),
                guess_count: Set(standing.guess_count as i32),
                solve_time_ms: Set(standing.solve_time_ms.map(|t| t as i64)),
                score: Set(standing.score),
                position: Set(standing.position as i32),
                ..Default::default()
            };
            if let Err(e) = GameResults::insert(model).exec(db).await {
                warn!("Failed to save result row for game {}: {}", game_id, e);
            }
        }
    }

    /// Whether this email already finished the given daily number. Errors
    /// (and a disabled store) read as "not completed"; the store is never
    /// authoritative for gameplay.
    pub async fn has_completed_daily_challenge(&self, email: &str, daily_number: u32) -> bool {
        let Some(db) = self.db.as_ref() else {
            return false;
        };
        let count = DailyCompletions::find()
            .filter(daily_completions::Column::PlayerEmail.eq(email))
            .filter(daily_completions::Column::DailyNumber.eq(daily_number as i32))
            .count(db)
            .await;
        match count {
            Ok(n) => n > 0,
            Err(e) => {
                warn!("Daily completion lookup failed for {}: {}", email, e);
                false
            }
        }
    }

    pub async fn save_daily_completions(
        &self,
        daily_number: u32,
        word: String,
        players: &[DailyCompletion],
    ) {
        let Some(db) = self.db.as_ref() else { return };
        for completion in players {
            let model = daily_completions::ActiveModel {
                daily_number: Set(daily_number as i32),
                word: Set(word.clone()),
                player_email: Set(completion.email.clone()),
                won: Set(completion.won),
                guess_count: Set(completion.guess_count as i32),
                solve_time_ms: Set(completion.solve_time_ms.map(|t| t as i64)),
                completed_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            };
            if let Err(e) = DailyCompletions::insert(model).exec(db).await {
                warn!(
                    "Failed to save daily completion for {}: {}",
                    completion.email, e
                );
            }
        }
    }
}

fn mode_label(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Casual => "casual",
        GameMode::Competitive => "competitive",
    }
}

fn word_mode_label(mode: WordMode) -> &'static str {
    match mode {
        WordMode::Daily => "daily",
        WordMode::Random => "random",
        WordMode::Sabotage => "sabotage",
    }
}

fn encode_letters(letters: &[LetterStatus]) -> String {
    letters
        .iter()
        .map(|status| match status {
            LetterStatus::Correct => 'C',
            LetterStatus::Present => 'P',
            LetterStatus::Absent => 'A',
        })
        .collect()
}
