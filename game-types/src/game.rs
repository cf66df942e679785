use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub type PlayerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum RoomPhase {
    Waiting,
    Selecting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    Casual,
    Competitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum WordMode {
    Daily,
    Random,
    Sabotage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum LetterStatus {
    Correct, // Green - right letter, right position
    Present, // Yellow - right letter, wrong position
    Absent,  // Gray - letter not in word
}

/// One recorded guess as the guessing player sees it: letters included.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGuess {
    pub word: String,
    pub letters: Vec<LetterStatus>,
}

/// Sabotage-mode assignment. The picker chooses the word; the target is the
/// player who must solve it. Both ids are named so the direction can never
/// be confused with map-key convention.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WordAssignment {
    pub picker_id: PlayerId,
    pub picker_name: String,
    pub target_id: PlayerId,
    pub word: String,
    pub submitted_at: String, // ISO 8601 string
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub connected: bool,
    pub finished: bool,
    pub won: bool,
    pub guess_count: u32,
}

/// One row of the final ranking for a finished game.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FinalStanding {
    pub player_id: PlayerId,
    pub name: String,
    pub won: bool,
    pub guess_count: u32,
    pub solve_time_ms: Option<u64>,
    pub score: Option<i32>,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HardModeViolation {
    pub message: String,
    pub letter: String,
    pub position: Option<u32>,
}
