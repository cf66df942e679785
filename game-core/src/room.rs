use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use game_types::{
    FinalStanding, GameMode, HardModeViolation, PlayerGuess, PlayerId, PlayerIdentity, PlayerInfo,
    RoomPhase, WordAssignment, WordMode,
};

use crate::guess::{
    MAX_GUESSES, calculate_score, count_correct_letters, is_out_of_guesses, is_winning_result,
    validate_guess, validate_hard_mode,
};
use crate::words::{WordList, assign_sabotage_targets};

pub const MAX_PLAYERS: usize = 6;

#[derive(Debug, Error, PartialEq)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Player not in room")]
    PlayerNotFound,
    #[error("Not allowed in the current phase")]
    WrongPhase,
    #[error("Only the room creator may do that")]
    NotCreator,
    #[error("Every connected player must be ready")]
    NotAllReady,
    #[error("At least two players are needed to start")]
    NotEnoughPlayers,
    #[error("Guess must be {expected} letters")]
    WrongLength { expected: usize },
    #[error("Word not in the accepted list")]
    WordNotAllowed,
    #[error("You have already finished this game")]
    AlreadyFinished,
    #[error("You have already submitted a word")]
    AlreadySubmitted,
    #[error("No word assigned for this player")]
    NoTargetWord,
    #[error("This room cannot be replayed")]
    RematchNotAllowed,
}

#[derive(Debug, Error)]
pub enum GuessError {
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error("Hard mode violation: {}", .0.message)]
    HardMode(HardModeViolation),
}

/// Outcome of one accepted guess, ready for fan-out: the full detail goes to
/// the guesser, the color row to everyone else.
#[derive(Debug, Clone)]
pub struct GuessRecord {
    pub word: String,
    pub letters: Vec<game_types::LetterStatus>,
    pub guess_number: u32,
    pub is_win: bool,
    pub is_loss: bool,
    pub green_count: u32,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionProgress {
    pub submitted: u32,
    pub total: u32,
    pub complete: bool,
}

#[derive(Debug)]
pub struct RoomPlayer {
    pub identity: PlayerIdentity,
    pub ready: bool,
    pub connected: bool,
    pub disconnected_at: Option<Instant>,
    pub guesses: Vec<PlayerGuess>,
    pub finished: bool,
    pub won: bool,
    pub finish_time_ms: Option<u64>,
    pub score: Option<i32>,
    pub target_word: Option<String>,
}

impl RoomPlayer {
    fn new(identity: PlayerIdentity) -> Self {
        Self {
            identity,
            ready: false,
            connected: true,
            disconnected_at: None,
            guesses: Vec::new(),
            finished: false,
            won: false,
            finish_time_ms: None,
            score: None,
            target_word: None,
        }
    }

    fn reset_for_game(&mut self) {
        self.guesses.clear();
        self.finished = false;
        self.won = false;
        self.finish_time_ms = None;
        self.score = None;
        self.target_word = None;
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.identity.id,
            name: self.identity.display_name.clone(),
            ready: self.ready,
            connected: self.connected,
            finished: self.finished,
            won: self.won,
            guess_count: self.guesses.len() as u32,
        }
    }
}

/// One isolated game session: members, phase, word state, and the guessing
/// bookkeeping. Pure state machine; transports, timers, and persistence live
/// with the caller.
pub struct Room {
    pub code: String,
    pub phase: RoomPhase,
    pub game_mode: GameMode,
    pub word_mode: WordMode,
    pub hard_mode: bool,
    pub creator_id: PlayerId,
    players: HashMap<PlayerId, RoomPlayer>,
    join_order: Vec<PlayerId>,
    /// Shared target for daily/random games. Sabotage targets live on the
    /// players via the assignments.
    pub target_word: Option<String>,
    assignments: Vec<WordAssignment>,
    /// picker -> target pairs for the current selection phase.
    selection_pairs: Vec<(PlayerId, PlayerId)>,
    pub started_at: Option<Instant>,
    /// Member count when the current game began, so a multiplayer game that
    /// loses players down to one is still recognized as multiplayer.
    pub started_player_count: usize,
    pub daily_number: Option<u32>,
    pub db_game_id: Option<Uuid>,
    standings: Vec<FinalStanding>,
}

impl Room {
    pub fn new(
        code: String,
        creator: PlayerIdentity,
        game_mode: GameMode,
        word_mode: WordMode,
        hard_mode: bool,
    ) -> Self {
        let creator_id = creator.id;
        let mut players = HashMap::new();
        players.insert(creator_id, RoomPlayer::new(creator));

        Self {
            code,
            phase: RoomPhase::Waiting,
            game_mode,
            word_mode,
            hard_mode,
            creator_id,
            players,
            join_order: vec![creator_id],
            target_word: None,
            assignments: Vec::new(),
            selection_pairs: Vec::new(),
            started_at: None,
            started_player_count: 0,
            daily_number: None,
            db_game_id: None,
            standings: Vec::new(),
        }
    }

    pub fn add_player(&mut self, identity: PlayerIdentity) -> Result<(), RoomError> {
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::WrongPhase);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }

        let id = identity.id;
        self.players.insert(id, RoomPlayer::new(identity));
        self.join_order.push(id);
        Ok(())
    }

    pub fn player(&self, id: PlayerId) -> Result<&RoomPlayer, RoomError> {
        self.players.get(&id).ok_or(RoomError::PlayerNotFound)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut RoomPlayer, RoomError> {
        self.players.get_mut(&id).ok_or(RoomError::PlayerNotFound)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Players in join order.
    pub fn players(&self) -> impl Iterator<Item = &RoomPlayer> {
        self.join_order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.join_order.clone()
    }

    pub fn player_infos(&self) -> Vec<PlayerInfo> {
        self.players().map(|p| p.info()).collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.connected).count()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_solo(&self) -> bool {
        self.players.len() == 1
    }

    /// Daily rooms are single-attempt challenges.
    pub fn is_challenge(&self) -> bool {
        self.word_mode == WordMode::Daily
    }

    pub fn set_ready(&mut self, id: PlayerId, ready: bool) -> Result<(), RoomError> {
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::WrongPhase);
        }
        self.player_mut(id)?.ready = ready;
        Ok(())
    }

    /// Whether `requester` may start the game right now.
    pub fn check_start(&self, requester: PlayerId) -> Result<(), RoomError> {
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::WrongPhase);
        }
        if requester != self.creator_id {
            return Err(RoomError::NotCreator);
        }
        if !self.is_solo() && self.connected_count() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        let all_ready = self
            .players
            .values()
            .filter(|p| p.connected)
            .all(|p| p.ready);
        if !all_ready || self.connected_count() == 0 {
            return Err(RoomError::NotAllReady);
        }
        Ok(())
    }

    // --- selection phase (sabotage) ---

    /// Enter the selecting phase: shuffle members and assign each one a
    /// target to pick for. Returns the (picker, target) pairs for messaging.
    pub fn begin_selection<R: Rng>(&mut self, rng: &mut R) -> Vec<(PlayerId, PlayerId)> {
        self.phase = RoomPhase::Selecting;
        self.assignments.clear();
        self.selection_pairs = assign_sabotage_targets(&self.join_order, rng);
        self.selection_pairs.clone()
    }

    pub fn selection_target_of(&self, picker: PlayerId) -> Option<PlayerId> {
        self.selection_pairs
            .iter()
            .find(|(p, _)| *p == picker)
            .map(|(_, t)| *t)
    }

    pub fn has_submitted_word(&self, picker: PlayerId) -> bool {
        self.assignments.iter().any(|a| a.picker_id == picker)
    }

    pub fn submit_word(
        &mut self,
        picker: PlayerId,
        word: &str,
        words: &WordList,
    ) -> Result<SelectionProgress, RoomError> {
        if self.phase != RoomPhase::Selecting {
            return Err(RoomError::WrongPhase);
        }
        let target_id = self
            .selection_target_of(picker)
            .ok_or(RoomError::PlayerNotFound)?;
        if self.has_submitted_word(picker) {
            return Err(RoomError::AlreadySubmitted);
        }
        let word = word.trim().to_lowercase();
        if !words.is_answer(&word) {
            return Err(RoomError::WordNotAllowed);
        }

        let picker_name = self.player(picker)?.identity.display_name.clone();
        self.assignments.push(WordAssignment {
            picker_id: picker,
            picker_name,
            target_id,
            word,
            submitted_at: chrono::Utc::now().to_rfc3339(),
        });

        Ok(self.selection_progress())
    }

    pub fn selection_progress(&self) -> SelectionProgress {
        let total = self.selection_pairs.len() as u32;
        let submitted = self.assignments.len() as u32;
        SelectionProgress {
            submitted,
            total,
            complete: submitted >= total,
        }
    }

    /// Fill in a random word for every picker who missed the deadline.
    /// Returns the pickers that were auto-assigned.
    pub fn resolve_selection_timeout<R: Rng>(
        &mut self,
        words: &WordList,
        rng: &mut R,
    ) -> Vec<PlayerId> {
        let mut auto_assigned = Vec::new();
        let pairs = self.selection_pairs.clone();
        for (picker, target) in pairs {
            if self.has_submitted_word(picker) {
                continue;
            }
            let picker_name = self
                .players
                .get(&picker)
                .map(|p| p.identity.display_name.clone())
                .unwrap_or_default();
            self.assignments.push(WordAssignment {
                picker_id: picker,
                picker_name,
                target_id: target,
                word: words.random_word(rng),
                submitted_at: chrono::Utc::now().to_rfc3339(),
            });
            auto_assigned.push(picker);
        }
        auto_assigned
    }

    pub fn assignments(&self) -> &[WordAssignment] {
        &self.assignments
    }

    // --- playing phase ---

    /// Enter the playing phase. `shared_target` supplies the word for daily
    /// and random games; sabotage games resolve each player's word from the
    /// assignments by `target_id`.
    pub fn begin_playing(&mut self, shared_target: Option<String>) -> Result<u32, RoomError> {
        for player in self.players.values_mut() {
            player.reset_for_game();
        }

        match self.word_mode {
            WordMode::Sabotage => {
                for id in self.join_order.clone() {
                    let word = self
                        .assignments
                        .iter()
                        .find(|a| a.target_id == id)
                        .map(|a| a.word.clone())
                        .ok_or(RoomError::NoTargetWord)?;
                    self.player_mut(id)?.target_word = Some(word);
                }
                self.target_word = None;
            }
            WordMode::Daily | WordMode::Random => {
                let word = shared_target.ok_or(RoomError::NoTargetWord)?;
                for player in self.players.values_mut() {
                    player.target_word = Some(word.clone());
                }
                self.target_word = Some(word);
            }
        }

        self.phase = RoomPhase::Playing;
        self.started_at = Some(Instant::now());
        self.started_player_count = self.players.len();
        self.standings.clear();

        let length = self
            .players
            .values()
            .find_map(|p| p.target_word.as_ref())
            .map(|w| w.chars().count())
            .unwrap_or(0);
        Ok(length as u32)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn record_guess(
        &mut self,
        player_id: PlayerId,
        word: &str,
        words: &WordList,
    ) -> Result<GuessRecord, GuessError> {
        if self.phase != RoomPhase::Playing {
            return Err(RoomError::WrongPhase.into());
        }

        let elapsed = self.elapsed_ms();
        let hard_mode = self.hard_mode;
        let competitive = self.game_mode == GameMode::Competitive;

        let player = self.players.get_mut(&player_id).ok_or(RoomError::PlayerNotFound)?;
        if player.finished {
            return Err(RoomError::AlreadyFinished.into());
        }
        let target = player
            .target_word
            .clone()
            .ok_or(RoomError::NoTargetWord)?;

        let word = word.trim().to_lowercase();
        let expected = target.chars().count();
        if word.chars().count() != expected {
            return Err(RoomError::WrongLength { expected }.into());
        }
        if !words.is_allowed(&word) {
            return Err(RoomError::WordNotAllowed.into());
        }
        if hard_mode {
            validate_hard_mode(&word, &player.guesses).map_err(GuessError::HardMode)?;
        }

        let letters = validate_guess(&word, &target);
        player.guesses.push(PlayerGuess {
            word: word.clone(),
            letters: letters.clone(),
        });

        let guess_number = player.guesses.len() as u32;
        let is_win = is_winning_result(&letters);
        let is_loss = !is_win && is_out_of_guesses(guess_number);

        if is_win || is_loss {
            player.finished = true;
            player.won = is_win;
            player.finish_time_ms = Some(elapsed);
            if is_win && competitive {
                player.score = Some(calculate_score(guess_number, elapsed));
            }
        }

        Ok(GuessRecord {
            green_count: count_correct_letters(&letters),
            finished: is_win || is_loss,
            word,
            letters,
            guess_number,
            is_win,
            is_loss,
        })
    }

    /// A disconnected player can never submit another guess, so they count
    /// as resolved for game termination.
    pub fn all_players_resolved(&self) -> bool {
        self.phase == RoomPhase::Playing
            && self
                .players
                .values()
                .all(|p| p.finished || !p.connected)
    }

    // --- finished phase ---

    /// Rank the players and move to the finished phase. Winners rank above
    /// losers; fewer guesses beat more; faster solves break remaining ties.
    pub fn finish_game(&mut self) -> Vec<FinalStanding> {
        self.phase = RoomPhase::Finished;

        let mut ranked: Vec<&RoomPlayer> = self.players().collect();
        ranked.sort_by(|a, b| {
            b.won
                .cmp(&a.won)
                .then(a.guesses.len().cmp(&b.guesses.len()))
                .then(
                    a.finish_time_ms
                        .unwrap_or(u64::MAX)
                        .cmp(&b.finish_time_ms.unwrap_or(u64::MAX)),
                )
        });

        self.standings = ranked
            .into_iter()
            .enumerate()
            .map(|(i, p)| FinalStanding {
                player_id: p.identity.id,
                name: p.identity.display_name.clone(),
                won: p.won,
                guess_count: p.guesses.len() as u32,
                solve_time_ms: p.finish_time_ms,
                score: p.score,
                position: (i + 1) as u32,
            })
            .collect();
        self.standings.clone()
    }

    pub fn standings(&self) -> &[FinalStanding] {
        &self.standings
    }

    /// Back to the waiting room for a rematch. Single-attempt challenge
    /// rooms refuse.
    pub fn reset_for_rematch(&mut self) -> Result<(), RoomError> {
        if self.phase != RoomPhase::Finished {
            return Err(RoomError::WrongPhase);
        }
        if self.is_challenge() {
            return Err(RoomError::RematchNotAllowed);
        }

        for player in self.players.values_mut() {
            player.reset_for_game();
            player.ready = false;
        }
        self.target_word = None;
        self.assignments.clear();
        self.selection_pairs.clear();
        self.started_at = None;
        self.db_game_id = None;
        self.standings.clear();
        self.phase = RoomPhase::Waiting;
        Ok(())
    }

    // --- membership / connection bookkeeping ---

    /// Idempotent: marking an already-disconnected player changes nothing
    /// and reports `false`.
    pub fn mark_disconnected(&mut self, id: PlayerId) -> Result<bool, RoomError> {
        let player = self.players.get_mut(&id).ok_or(RoomError::PlayerNotFound)?;
        if !player.connected {
            return Ok(false);
        }
        player.connected = false;
        player.disconnected_at = Some(Instant::now());
        Ok(true)
    }

    pub fn mark_connected(&mut self, id: PlayerId) -> Result<(), RoomError> {
        let player = self.players.get_mut(&id).ok_or(RoomError::PlayerNotFound)?;
        player.connected = true;
        player.disconnected_at = None;
        Ok(())
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Result<RoomPlayer, RoomError> {
        let player = self.players.remove(&id).ok_or(RoomError::PlayerNotFound)?;
        self.join_order.retain(|p| *p != id);
        Ok(player)
    }

    /// Pick a new creator after the old one left: the first remaining
    /// connected player in join order, or failing that anyone left.
    /// Returns the new creator when the seat actually changed hands.
    pub fn promote_creator(&mut self) -> Option<PlayerId> {
        if self.players.contains_key(&self.creator_id) {
            return None;
        }
        let next = self
            .players()
            .find(|p| p.connected)
            .or_else(|| self.players().next())
            .map(|p| p.identity.id)?;
        self.creator_id = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_types::LetterStatus;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ANSWERS: &str = "crate\ncrane\nhello\nllama\nstone\nround\nabide";

    fn words() -> WordList {
        WordList::from_lists(ANSWERS, "").unwrap()
    }

    fn make_room(mode: WordMode, n: usize) -> (Room, Vec<PlayerId>) {
        let creator = PlayerIdentity::new("p0");
        let mut ids = vec![creator.id];
        let mut room = Room::new("ABCDEF".into(), creator, GameMode::Casual, mode, false);
        for i in 1..n {
            let identity = PlayerIdentity::new(format!("p{}", i));
            ids.push(identity.id);
            room.add_player(identity).unwrap();
        }
        (room, ids)
    }

    fn ready_all(room: &mut Room, ids: &[PlayerId]) {
        for &id in ids {
            room.set_ready(id, true).unwrap();
        }
    }

    #[test]
    fn test_capacity_enforced() {
        let (mut room, _) = make_room(WordMode::Random, MAX_PLAYERS);
        let err = room.add_player(PlayerIdentity::new("extra")).unwrap_err();
        assert_eq!(err, RoomError::RoomFull);
    }

    #[test]
    fn test_start_requires_creator_and_readiness() {
        let (mut room, ids) = make_room(WordMode::Random, 2);
        assert_eq!(room.check_start(ids[1]).unwrap_err(), RoomError::NotCreator);
        assert_eq!(room.check_start(ids[0]).unwrap_err(), RoomError::NotAllReady);

        ready_all(&mut room, &ids);
        assert!(room.check_start(ids[0]).is_ok());
    }

    #[test]
    fn test_disconnected_players_do_not_block_start() {
        let (mut room, ids) = make_room(WordMode::Random, 3);
        room.set_ready(ids[0], true).unwrap();
        room.set_ready(ids[1], true).unwrap();
        room.mark_disconnected(ids[2]).unwrap();
        assert!(room.check_start(ids[0]).is_ok());
    }

    #[test]
    fn test_solo_start_allowed() {
        let (mut room, ids) = make_room(WordMode::Random, 1);
        room.set_ready(ids[0], true).unwrap();
        assert!(room.check_start(ids[0]).is_ok());
    }

    #[test]
    fn test_guess_flow_win() {
        let (mut room, ids) = make_room(WordMode::Random, 2);
        ready_all(&mut room, &ids);
        room.begin_playing(Some("crate".into())).unwrap();

        let record = room.record_guess(ids[0], "crane", &words()).unwrap();
        assert_eq!(record.guess_number, 1);
        assert!(!record.is_win);
        assert_eq!(record.green_count, 4);

        let record = room.record_guess(ids[0], "crate", &words()).unwrap();
        assert!(record.is_win);
        assert!(record.finished);
        assert!(room.player(ids[0]).unwrap().won);
        assert!(!room.all_players_resolved());

        let err = room.record_guess(ids[0], "crate", &words()).unwrap_err();
        assert!(matches!(err, GuessError::Room(RoomError::AlreadyFinished)));
    }

    #[test]
    fn test_loss_after_max_guesses() {
        let (mut room, ids) = make_room(WordMode::Random, 1);
        room.begin_playing(Some("crate".into())).unwrap();
        for i in 0..MAX_GUESSES {
            let record = room.record_guess(ids[0], "stone", &words()).unwrap();
            assert_eq!(record.guess_number, i + 1);
            assert_eq!(record.is_loss, i + 1 == MAX_GUESSES);
        }
        let player = room.player(ids[0]).unwrap();
        assert!(player.finished);
        assert!(!player.won);
    }

    #[test]
    fn test_malformed_guess_not_consumed() {
        let (mut room, ids) = make_room(WordMode::Random, 1);
        room.begin_playing(Some("crate".into())).unwrap();

        let err = room.record_guess(ids[0], "cranes", &words()).unwrap_err();
        assert!(matches!(
            err,
            GuessError::Room(RoomError::WrongLength { expected: 5 })
        ));
        let err = room.record_guess(ids[0], "zzzzz", &words()).unwrap_err();
        assert!(matches!(err, GuessError::Room(RoomError::WordNotAllowed)));
        assert_eq!(room.player(ids[0]).unwrap().guesses.len(), 0);
    }

    #[test]
    fn test_hard_mode_rejection_not_consumed() {
        let (mut room, ids) = make_room(WordMode::Random, 1);
        room.hard_mode = true;
        room.begin_playing(Some("crate".into())).unwrap();

        room.record_guess(ids[0], "crane", &words()).unwrap();
        let err = room.record_guess(ids[0], "stone", &words()).unwrap_err();
        assert!(matches!(err, GuessError::HardMode(_)));
        assert_eq!(room.player(ids[0]).unwrap().guesses.len(), 1);
    }

    #[test]
    fn test_disconnected_counts_as_resolved() {
        let (mut room, ids) = make_room(WordMode::Random, 2);
        room.begin_playing(Some("crate".into())).unwrap();

        room.record_guess(ids[0], "crate", &words()).unwrap();
        assert!(!room.all_players_resolved());

        room.mark_disconnected(ids[1]).unwrap();
        assert!(room.all_players_resolved());
    }

    #[test]
    fn test_duplicate_disconnect_is_noop() {
        let (mut room, ids) = make_room(WordMode::Random, 2);
        assert!(room.mark_disconnected(ids[1]).unwrap());
        assert!(!room.mark_disconnected(ids[1]).unwrap());
    }

    #[test]
    fn test_ranking_order_and_positions() {
        let (mut room, ids) = make_room(WordMode::Random, 3);
        room.begin_playing(Some("crate".into())).unwrap();

        // ids[0]: wins in 2. ids[1]: wins in 1. ids[2]: loses.
        room.record_guess(ids[0], "crane", &words()).unwrap();
        room.record_guess(ids[0], "crate", &words()).unwrap();
        room.record_guess(ids[1], "crate", &words()).unwrap();
        for _ in 0..MAX_GUESSES {
            room.record_guess(ids[2], "stone", &words()).unwrap();
        }

        let standings = room.finish_game();
        assert_eq!(room.phase, RoomPhase::Finished);
        assert_eq!(standings[0].player_id, ids[1]);
        assert_eq!(standings[1].player_id, ids[0]);
        assert_eq!(standings[2].player_id, ids[2]);
        assert_eq!(
            standings.iter().map(|s| s.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(standings[0].won && standings[1].won && !standings[2].won);
    }

    #[test]
    fn test_competitive_score_assigned_on_win_only() {
        let creator = PlayerIdentity::new("p0");
        let id = creator.id;
        let mut room = Room::new(
            "ABCDEF".into(),
            creator,
            GameMode::Competitive,
            WordMode::Random,
            false,
        );
        room.begin_playing(Some("crate".into())).unwrap();
        room.record_guess(id, "crate", &words()).unwrap();
        let score = room.player(id).unwrap().score.unwrap();
        assert!(score >= 600, "1-guess win scores at least the guess bonus");
    }

    #[test]
    fn test_rematch_resets_state() {
        let (mut room, ids) = make_room(WordMode::Random, 2);
        room.begin_playing(Some("crate".into())).unwrap();
        room.record_guess(ids[0], "crate", &words()).unwrap();
        room.mark_disconnected(ids[1]).unwrap();
        room.finish_game();

        room.mark_connected(ids[1]).unwrap();
        room.reset_for_rematch().unwrap();
        assert_eq!(room.phase, RoomPhase::Waiting);
        let p0 = room.player(ids[0]).unwrap();
        assert!(p0.guesses.is_empty() && !p0.finished && !p0.ready);
        assert!(room.target_word.is_none());
    }

    #[test]
    fn test_daily_room_rejects_rematch() {
        let (mut room, ids) = make_room(WordMode::Daily, 2);
        room.begin_playing(Some("crate".into())).unwrap();
        room.record_guess(ids[0], "crate", &words()).unwrap();
        room.mark_disconnected(ids[1]).unwrap();
        room.finish_game();
        assert_eq!(room.reset_for_rematch().unwrap_err(), RoomError::RematchNotAllowed);
    }

    #[test]
    fn test_selection_phase_flow() {
        let (mut room, ids) = make_room(WordMode::Sabotage, 3);
        let mut rng = StdRng::seed_from_u64(11);
        let pairs = room.begin_selection(&mut rng);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(p, t)| p != t));

        let progress = room.submit_word(ids[0], "crate", &words()).unwrap();
        assert_eq!(progress.submitted, 1);
        assert!(!progress.complete);

        assert_eq!(
            room.submit_word(ids[0], "crane", &words()).unwrap_err(),
            RoomError::AlreadySubmitted
        );
        assert_eq!(
            room.submit_word(ids[1], "zzzzz", &words()).unwrap_err(),
            RoomError::WordNotAllowed
        );

        let auto = room.resolve_selection_timeout(&words(), &mut rng);
        assert_eq!(auto.len(), 2);
        assert!(room.selection_progress().complete);

        // Every target got exactly one word, and playing resolves them.
        let length = room.begin_playing(None).unwrap();
        assert_eq!(length, 5);
        for &id in &ids {
            let target = room.player(id).unwrap().target_word.clone().unwrap();
            assert!(words().is_answer(&target));
            // The solver's word was picked by someone else.
            let assignment = room
                .assignments()
                .iter()
                .find(|a| a.target_id == id)
                .unwrap();
            assert_ne!(assignment.picker_id, id);
        }
    }

    #[test]
    fn test_creator_promotion_prefers_connected() {
        let (mut room, ids) = make_room(WordMode::Random, 3);
        room.mark_disconnected(ids[1]).unwrap();
        room.remove_player(ids[0]).unwrap();

        let promoted = room.promote_creator().unwrap();
        assert_eq!(promoted, ids[2], "skips the disconnected player");
        assert_eq!(room.creator_id, ids[2]);
        assert!(room.promote_creator().is_none());
    }

    #[test]
    fn test_creator_promotion_falls_back_to_any() {
        let (mut room, ids) = make_room(WordMode::Random, 2);
        room.mark_disconnected(ids[1]).unwrap();
        room.remove_player(ids[0]).unwrap();
        assert_eq!(room.promote_creator(), Some(ids[1]));
    }

    #[test]
    fn test_guess_rejected_outside_playing() {
        let (mut room, ids) = make_room(WordMode::Random, 1);
        let err = room.record_guess(ids[0], "crate", &words()).unwrap_err();
        assert!(matches!(err, GuessError::Room(RoomError::WrongPhase)));
    }

    #[test]
    fn test_opponent_row_never_contains_letters() {
        // GuessRecord keeps the letters and colors separate; the color row
        // alone reconstructs nothing.
        let (mut room, ids) = make_room(WordMode::Random, 1);
        room.begin_playing(Some("crate".into())).unwrap();
        let record = room.record_guess(ids[0], "crane", &words()).unwrap();
        assert_eq!(record.letters.len(), 5);
        assert_eq!(
            record.letters.iter().filter(|s| **s == LetterStatus::Correct).count() as u32,
            record.green_count
        );
    }
}
