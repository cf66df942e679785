use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    FinalStanding, GameMode, HardModeViolation, LetterStatus, PlayerGuess, PlayerInfo,
    RejoinFailReason, WordAssignment, WordMode,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        name: String,
        email: Option<String>,
        game_mode: GameMode,
        word_mode: WordMode,
        hard_mode: bool,
    },
    JoinRoom {
        room_code: String,
        name: String,
        email: Option<String>,
    },
    SetReady {
        ready: bool,
    },
    StartGame,
    SubmitWord {
        word: String,
    },
    Guess {
        word: String,
    },
    PlayAgain,
    Rejoin {
        room_code: String,
        player_id: Uuid,
    },
    LeaveRoom,
    CloseRoom,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_code: String,
        player_id: Uuid,
        game_mode: GameMode,
        word_mode: WordMode,
        hard_mode: bool,
    },
    RoomJoined {
        room_code: String,
        player_id: Uuid,
        game_mode: GameMode,
        word_mode: WordMode,
        hard_mode: bool,
        players: Vec<PlayerInfo>,
    },
    PlayerJoined {
        player: PlayerInfo,
    },
    PlayerLeft {
        player_id: Uuid,
        new_creator_id: Option<Uuid>,
    },
    PlayerReadyChanged {
        player_id: Uuid,
        ready: bool,
    },
    PlayerDisconnected {
        player_id: Uuid,
        grace_period_seconds: u64,
    },
    PlayerReconnected {
        player_id: Uuid,
    },
    Countdown {
        count: u32,
    },
    SelectionPhaseStarted {
        deadline_seconds: u64,
        target_id: Uuid,
        target_name: String,
    },
    SelectionProgress {
        submitted: u32,
        total: u32,
    },
    AllWordsSubmitted,
    SelectionTimeout {
        auto_assigned: Vec<Uuid>,
    },
    GameStarted {
        word_length: u32,
        players: Vec<PlayerInfo>,
    },
    /// Sent only to the guessing player; contains the letters.
    GuessResult {
        word: String,
        result: Vec<LetterStatus>,
        guess_number: u32,
        is_win: bool,
        is_loss: bool,
    },
    /// Sent to everyone else; colors only, the letters never leave the
    /// guesser's connection.
    OpponentGuess {
        player_id: Uuid,
        colors: Vec<LetterStatus>,
        green_count: u32,
        is_finished: bool,
        won: bool,
    },
    HardModeViolation {
        violation: HardModeViolation,
    },
    TimerSync {
        game_time_ms: u64,
        player_times: Vec<PlayerTime>,
    },
    GameEnded {
        word: Option<String>,
        results: Vec<FinalStanding>,
        word_assignments: Option<Vec<WordAssignment>>,
    },
    RejoinWaiting {
        room_code: String,
        players: Vec<PlayerInfo>,
    },
    RejoinSelecting {
        room_code: String,
        target_id: Uuid,
        target_name: String,
        already_submitted: bool,
        deadline_seconds: u64,
    },
    RejoinGame {
        room_code: String,
        word_length: u32,
        guesses: Vec<PlayerGuess>,
        players: Vec<PlayerInfo>,
        game_time_ms: u64,
    },
    RejoinResults {
        room_code: String,
        word: Option<String>,
        results: Vec<FinalStanding>,
    },
    RejoinFailed {
        reason: RejoinFailReason,
    },
    RematchStarted {
        players: Vec<PlayerInfo>,
    },
    RoomClosed {
        reason: String,
    },
    /// Ack to a voluntary leave; carries the leaver's in-progress guesses so
    /// a single-attempt client can offer "resume later".
    RoomLeft {
        guesses: Option<Vec<PlayerGuess>>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTime {
    pub player_id: Uuid,
    pub elapsed_ms: u64,
    pub finished: bool,
}
