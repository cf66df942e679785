use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::sync::RwLock;
use tracing::{info, warn};

use game_core::room::{GuessError, Room, RoomError};
use game_core::words::{WordList, current_daily_number};
use game_persistence::{DailyCompletion, GameRecordMeta, StatsStore};
use game_types::{
    FinalStanding, PlayerId, PlayerIdentity, PlayerTime, RejoinFailReason, RoomPhase,
    ServerMessage, WordMode,
};
use uuid::Uuid;

use crate::config::Config;
use crate::timers::{
    TimerHandle, spawn_countdown, spawn_grace_removal, spawn_selection_deadline, spawn_timer_sync,
};
use crate::websocket::connection::{ConnectionId, ConnectionManager};

const ROOM_CODE_LENGTH: usize = 6;

#[derive(Default)]
struct RoomTimers {
    countdown: Option<TimerHandle>,
    sync: Option<TimerHandle>,
    selection_deadline: Option<TimerHandle>,
    removals: HashMap<PlayerId, TimerHandle>,
}

struct RoomEntry {
    room: Room,
    timers: RoomTimers,
    selection_deadline_at: Option<Instant>,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        Self {
            room,
            timers: RoomTimers::default(),
            selection_deadline_at: None,
        }
    }

    fn selection_seconds_remaining(&self) -> u64 {
        self.selection_deadline_at
            .map(|at| at.saturating_duration_since(Instant::now()).as_secs())
            .unwrap_or(0)
    }
}

#[derive(Default)]
struct RegistryState {
    rooms: HashMap<String, RoomEntry>,
    player_to_room: HashMap<PlayerId, String>,
}

/// Messages staged under the registry lock and delivered after it drops, so
/// the lock is never held while talking to transports.
#[derive(Default)]
struct Outbox {
    messages: Vec<(PlayerId, ServerMessage)>,
}

impl Outbox {
    fn push(&mut self, to: PlayerId, message: ServerMessage) {
        self.messages.push((to, message));
    }

    fn push_all(&mut self, to: &[PlayerId], message: ServerMessage) {
        for &player_id in to {
            self.messages.push((player_id, message.clone()));
        }
    }

    async fn deliver(self, connections: &ConnectionManager) {
        for (player_id, message) in self.messages {
            connections.send_to_player(player_id, message).await;
        }
    }
}

/// Everything a finished game wants persisted, snapshotted under the lock
/// and written by a detached task.
struct GameEndPersist {
    game_id: Option<Uuid>,
    word: Option<String>,
    results: Vec<(FinalStanding, Option<String>)>,
    daily: Option<(u32, String, Vec<DailyCompletion>)>,
}

/// All live rooms plus the player-to-room index. Every mutation happens
/// under one write lock; anything sent to players or awaited elsewhere works
/// from snapshots taken before the lock drops.
pub struct RoomRegistry {
    state: RwLock<RegistryState>,
    pub connections: Arc<ConnectionManager>,
    words: Arc<WordList>,
    stats: Arc<StatsStore>,
    config: Config,
}

impl RoomRegistry {
    pub fn new(
        connections: Arc<ConnectionManager>,
        words: Arc<WordList>,
        stats: Arc<StatsStore>,
        config: Config,
    ) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            connections,
            words,
            stats,
            config,
        }
    }

    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    async fn send_error(&self, connection_id: ConnectionId, message: impl Into<String>) {
        self.connections
            .send_to_connection(
                connection_id,
                ServerMessage::Error {
                    message: message.into(),
                },
            )
            .await;
    }

    /// The player a connection speaks for, or an error to the client.
    async fn require_player(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        let player_id = self.connections.player_for(connection_id).await;
        if player_id.is_none() {
            self.send_error(connection_id, "You are not in a room").await;
        }
        player_id
    }

    // --- lobby ---

    pub async fn create_room(
        &self,
        connection_id: ConnectionId,
        name: String,
        email: Option<String>,
        game_mode: game_types::GameMode,
        word_mode: WordMode,
        hard_mode: bool,
    ) {
        // A connection speaks for at most one player. Rebinding here would
        // leave the old player marked connected with no transport.
        if self.connections.player_for(connection_id).await.is_some() {
            self.send_error(connection_id, "Already in a room").await;
            return;
        }

        let identity = match email {
            Some(email) => PlayerIdentity::with_email(name, email),
            None => PlayerIdentity::new(name),
        };
        let player_id = identity.id;

        let mut state = self.state.write().await;
        let code = generate_room_code(&state.rooms);
        let room = Room::new(code.clone(), identity, game_mode, word_mode, hard_mode);
        state.rooms.insert(code.clone(), RoomEntry::new(room));
        state.player_to_room.insert(player_id, code.clone());
        drop(state);

        self.connections.bind_player(connection_id, player_id).await;
        info!("Room {} created by player {}", code, player_id);
        self.connections
            .send_to_connection(
                connection_id,
                ServerMessage::RoomCreated {
                    room_code: code,
                    player_id,
                    game_mode,
                    word_mode,
                    hard_mode,
                },
            )
            .await;
    }

    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room_code: String,
        name: String,
        email: Option<String>,
    ) {
        if self.connections.player_for(connection_id).await.is_some() {
            self.send_error(connection_id, "Already in a room").await;
            return;
        }

        let room_code = room_code.trim().to_uppercase();
        let identity = match email {
            Some(email) => PlayerIdentity::with_email(name, email),
            None => PlayerIdentity::new(name),
        };
        let player_id = identity.id;

        let mut state = self.state.write().await;
        let Some(entry) = state.rooms.get_mut(&room_code) else {
            drop(state);
            self.send_error(connection_id, "Room not found").await;
            return;
        };

        if let Err(e) = entry.room.add_player(identity) {
            drop(state);
            self.send_error(connection_id, e.to_string()).await;
            return;
        }

        let mut outbox = Outbox::default();
        let players = entry.room.player_infos();
        let joined = entry
            .room
            .players()
            .find(|p| p.identity.id == player_id)
            .map(|p| p.info());
        let others: Vec<PlayerId> = entry
            .room
            .player_ids()
            .into_iter()
            .filter(|id| *id != player_id)
            .collect();
        if let Some(player) = joined {
            outbox.push_all(&others, ServerMessage::PlayerJoined { player });
        }
        let (game_mode, word_mode, hard_mode) =
            (entry.room.game_mode, entry.room.word_mode, entry.room.hard_mode);
        state.player_to_room.insert(player_id, room_code.clone());
        drop(state);

        self.connections.bind_player(connection_id, player_id).await;
        self.connections
            .send_to_connection(
                connection_id,
                ServerMessage::RoomJoined {
                    room_code,
                    player_id,
                    game_mode,
                    word_mode,
                    hard_mode,
                    players,
                },
            )
            .await;
        outbox.deliver(&self.connections).await;
    }

    pub async fn set_ready(&self, connection_id: ConnectionId, ready: bool) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(entry) = entry_for_player(&mut state, player_id) else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };

        let mut outbox = Outbox::default();
        match entry.room.set_ready(player_id, ready) {
            Ok(()) => outbox.push_all(
                &entry.room.player_ids(),
                ServerMessage::PlayerReadyChanged { player_id, ready },
            ),
            Err(e) => {
                drop(state);
                self.send_error(connection_id, e.to_string()).await;
                return;
            }
        }
        drop(state);
        outbox.deliver(&self.connections).await;
    }

    // --- game start ---

    pub async fn start_game(self: Arc<Self>, connection_id: ConnectionId) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        // First pass validates and, for daily rooms, snapshots the verified
        // emails to gate on. The completion lookup happens off-lock.
        let gate: Option<(u32, Vec<(String, String)>)>;
        {
            let mut state = self.state.write().await;
            let Some(entry) = entry_for_player(&mut state, player_id) else {
                drop(state);
                self.send_error(connection_id, "You are not in a room").await;
                return;
            };
            if let Err(e) = entry.room.check_start(player_id) {
                drop(state);
                self.send_error(connection_id, e.to_string()).await;
                return;
            }
            gate = if entry.room.is_challenge() && self.stats.is_enabled() {
                let emails = entry
                    .room
                    .players()
                    .filter_map(|p| {
                        p.identity
                            .email
                            .clone()
                            .map(|e| (p.identity.display_name.clone(), e))
                    })
                    .collect();
                Some((current_daily_number(), emails))
            } else {
                None
            };
        }

        if let Some((daily_number, emails)) = gate {
            for (name, email) in emails {
                if self
                    .stats
                    .has_completed_daily_challenge(&email, daily_number)
                    .await
                {
                    self.send_error(
                        connection_id,
                        format!("{} has already played today's challenge", name),
                    )
                    .await;
                    return;
                }
            }
        }

        // Second pass re-validates: the room may have changed while the
        // completion lookup ran.
        let mut state = self.state.write().await;
        let Some((room_code, entry)) = coded_entry_for_player(&mut state, player_id) else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };
        if let Err(e) = entry.room.check_start(player_id) {
            drop(state);
            self.send_error(connection_id, e.to_string()).await;
            return;
        }

        let mut outbox = Outbox::default();
        if entry.room.word_mode == WordMode::Sabotage {
            let pairs = {
                let mut rng = rand::thread_rng();
                entry.room.begin_selection(&mut rng)
            };
            let deadline = self.config.selection_deadline_seconds;
            for (picker, target) in pairs {
                let target_name = entry
                    .room
                    .player(target)
                    .map(|p| p.identity.display_name.clone())
                    .unwrap_or_default();
                outbox.push(
                    picker,
                    ServerMessage::SelectionPhaseStarted {
                        deadline_seconds: deadline,
                        target_id: target,
                        target_name,
                    },
                );
            }
            entry.selection_deadline_at =
                Some(Instant::now() + std::time::Duration::from_secs(deadline));
            entry.timers.selection_deadline = Some(spawn_selection_deadline(
                self.clone(),
                room_code.clone(),
                deadline,
            ));
            info!("Room {} entered word selection", room_code);
        } else {
            entry.timers.countdown = Some(spawn_countdown(
                self.clone(),
                room_code.clone(),
                self.config.countdown_seconds,
            ));
        }
        drop(state);
        outbox.deliver(&self.connections).await;
    }

    /// Countdown expiry: resolve the target word and move to playing.
    pub async fn begin_play(self: Arc<Self>, room_code: &str) {
        let mut state = self.state.write().await;
        let Some(entry) = state.rooms.get_mut(room_code) else {
            return;
        };
        if let Some(handle) = entry.timers.countdown.take() {
            handle.disarm();
        }
        entry.selection_deadline_at = None;

        let shared_target = match entry.room.word_mode {
            WordMode::Daily => {
                let n = current_daily_number();
                entry.room.daily_number = Some(n);
                Some(self.words.daily_word(n).to_string())
            }
            WordMode::Random => {
                let mut rng = rand::thread_rng();
                Some(self.words.random_word(&mut rng))
            }
            WordMode::Sabotage => None,
        };

        let word_length = match entry.room.begin_playing(shared_target) {
            Ok(length) => length,
            Err(e) => {
                warn!("Room {} failed to start playing: {}", room_code, e);
                return;
            }
        };

        let mut outbox = Outbox::default();
        outbox.push_all(
            &entry.room.player_ids(),
            ServerMessage::GameStarted {
                word_length,
                players: entry.room.player_infos(),
            },
        );

        let meta = GameRecordMeta {
            room_code: room_code.to_string(),
            game_mode: entry.room.game_mode,
            word_mode: entry.room.word_mode,
            word: entry.room.target_word.clone(),
            player_count: entry.room.started_player_count as u32,
        };
        entry.timers.sync = Some(spawn_timer_sync(self.clone(), room_code.to_string()));
        drop(state);

        info!("Room {} started playing", room_code);
        outbox.deliver(&self.connections).await;

        // Open the stats record off to the side; the game never waits on it.
        let registry = self.clone();
        let stats = self.stats.clone();
        let code = room_code.to_string();
        tokio::spawn(async move {
            let Some(game_id) = stats.create_game(meta).await else {
                return;
            };
            let mut state = registry.state.write().await;
            if let Some(entry) = state.rooms.get_mut(&code) {
                if entry.room.phase == RoomPhase::Playing && entry.room.db_game_id.is_none() {
                    entry.room.db_game_id = Some(game_id);
                }
            }
        });
    }

    /// One timer tick. Returns false once the room is gone or no longer
    /// playing, which stops the sync task.
    pub async fn broadcast_timer_sync(&self, room_code: &str) -> bool {
        let state = self.state.read().await;
        let Some(entry) = state.rooms.get(room_code) else {
            return false;
        };
        if entry.room.phase != RoomPhase::Playing {
            return false;
        }

        let game_time_ms = entry.room.elapsed_ms();
        let player_times: Vec<PlayerTime> = entry
            .room
            .players()
            .map(|p| PlayerTime {
                player_id: p.identity.id,
                elapsed_ms: if p.finished {
                    p.finish_time_ms.unwrap_or(game_time_ms)
                } else {
                    game_time_ms
                },
                finished: p.finished,
            })
            .collect();
        let player_ids = entry.room.player_ids();
        drop(state);

        self.connections
            .send_to_players(
                &player_ids,
                ServerMessage::TimerSync {
                    game_time_ms,
                    player_times,
                },
            )
            .await;
        true
    }

    // --- selection phase ---

    pub async fn submit_word(self: Arc<Self>, connection_id: ConnectionId, word: String) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some((room_code, entry)) = coded_entry_for_player(&mut state, player_id) else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };

        let progress = match entry.room.submit_word(player_id, &word, &self.words) {
            Ok(progress) => progress,
            Err(e) => {
                drop(state);
                self.send_error(connection_id, e.to_string()).await;
                return;
            }
        };

        let mut outbox = Outbox::default();
        let everyone = entry.room.player_ids();
        outbox.push_all(
            &everyone,
            ServerMessage::SelectionProgress {
                submitted: progress.submitted,
                total: progress.total,
            },
        );
        if progress.complete {
            outbox.push_all(&everyone, ServerMessage::AllWordsSubmitted);
            if let Some(handle) = entry.timers.selection_deadline.take() {
                handle.cancel();
            }
            entry.selection_deadline_at = None;
            entry.timers.countdown = Some(spawn_countdown(
                self.clone(),
                room_code,
                self.config.countdown_seconds,
            ));
        }
        drop(state);
        outbox.deliver(&self.connections).await;
    }

    /// Selection deadline expiry: auto-assign the missing words and move on.
    pub async fn selection_deadline_fired(self: Arc<Self>, room_code: &str) {
        let mut state = self.state.write().await;
        let Some(entry) = state.rooms.get_mut(room_code) else {
            return;
        };
        if entry.room.phase != RoomPhase::Selecting {
            return;
        }
        if let Some(handle) = entry.timers.selection_deadline.take() {
            handle.disarm();
        }
        entry.selection_deadline_at = None;

        let auto_assigned = {
            let mut rng = rand::thread_rng();
            entry.room.resolve_selection_timeout(&self.words, &mut rng)
        };
        info!(
            "Room {} selection deadline, auto-assigned {} words",
            room_code,
            auto_assigned.len()
        );

        let mut outbox = Outbox::default();
        outbox.push_all(
            &entry.room.player_ids(),
            ServerMessage::SelectionTimeout { auto_assigned },
        );
        entry.timers.countdown = Some(spawn_countdown(
            self.clone(),
            room_code.to_string(),
            self.config.countdown_seconds,
        ));
        drop(state);
        outbox.deliver(&self.connections).await;
    }

    // --- playing phase ---

    pub async fn guess(&self, connection_id: ConnectionId, word: String) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(entry) = entry_for_player(&mut state, player_id) else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };

        let elapsed = entry.room.elapsed_ms();
        let record = match entry.room.record_guess(player_id, &word, &self.words) {
            Ok(record) => record,
            Err(GuessError::HardMode(violation)) => {
                drop(state);
                self.connections
                    .send_to_connection(
                        connection_id,
                        ServerMessage::HardModeViolation { violation },
                    )
                    .await;
                return;
            }
            Err(GuessError::Room(e)) => {
                drop(state);
                self.send_error(connection_id, e.to_string()).await;
                return;
            }
        };

        let mut outbox = Outbox::default();
        outbox.push(
            player_id,
            ServerMessage::GuessResult {
                word: record.word.clone(),
                result: record.letters.clone(),
                guess_number: record.guess_number,
                is_win: record.is_win,
                is_loss: record.is_loss,
            },
        );
        let others: Vec<PlayerId> = entry
            .room
            .player_ids()
            .into_iter()
            .filter(|id| *id != player_id)
            .collect();
        outbox.push_all(
            &others,
            ServerMessage::OpponentGuess {
                player_id,
                colors: record.letters.clone(),
                green_count: record.green_count,
                is_finished: record.finished,
                won: record.is_win,
            },
        );

        let persist_guess = entry.room.db_game_id.map(|game_id| {
            let email = entry
                .room
                .player(player_id)
                .ok()
                .and_then(|p| p.identity.email.clone());
            (game_id, email, record.guess_number, record.word.clone())
        });

        let mut persist_end = None;
        if record.finished && entry.room.all_players_resolved() {
            persist_end = Some(self.end_game_locked(entry, &mut outbox));
        }
        drop(state);

        outbox.deliver(&self.connections).await;
        if let Some((game_id, email, guess_number, word)) = persist_guess {
            let stats = self.stats.clone();
            let letters = record.letters.clone();
            tokio::spawn(async move {
                stats
                    .save_guess(game_id, email, guess_number, word, elapsed, &letters)
                    .await;
            });
        }
        if let Some(persist) = persist_end {
            self.spawn_game_end_persist(persist);
        }
    }

    // --- finished phase ---

    pub async fn play_again(&self, connection_id: ConnectionId) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(entry) = entry_for_player(&mut state, player_id) else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };

        if let Err(e) = entry.room.reset_for_rematch() {
            drop(state);
            self.send_error(connection_id, e.to_string()).await;
            return;
        }

        let mut outbox = Outbox::default();
        outbox.push_all(
            &entry.room.player_ids(),
            ServerMessage::RematchStarted {
                players: entry.room.player_infos(),
            },
        );
        drop(state);
        outbox.deliver(&self.connections).await;
    }

    // --- reconnect / leave ---

    pub async fn rejoin(&self, connection_id: ConnectionId, room_code: String, player_id: Uuid) {
        let room_code = room_code.trim().to_uppercase();
        if room_code.is_empty() || player_id.is_nil() {
            self.rejoin_failed(connection_id, RejoinFailReason::InvalidParams)
                .await;
            return;
        }
        // A connection already speaking for someone else cannot claim a
        // second player.
        if let Some(bound) = self.connections.player_for(connection_id).await {
            if bound != player_id {
                self.rejoin_failed(connection_id, RejoinFailReason::InvalidParams)
                    .await;
                return;
            }
        }

        let mut state = self.state.write().await;
        let Some(entry) = state.rooms.get_mut(&room_code) else {
            drop(state);
            self.rejoin_failed(connection_id, RejoinFailReason::RoomNotFound)
                .await;
            return;
        };
        if !entry.room.contains(player_id) {
            drop(state);
            self.rejoin_failed(connection_id, RejoinFailReason::PlayerNotFound)
                .await;
            return;
        }

        if let Some(handle) = entry.timers.removals.remove(&player_id) {
            handle.cancel();
        }
        if let Err(e) = entry.room.mark_connected(player_id) {
            drop(state);
            warn!("Rejoin bookkeeping failed for {}: {}", player_id, e);
            self.rejoin_failed(connection_id, RejoinFailReason::PlayerNotFound)
                .await;
            return;
        }

        let snapshot = match entry.room.phase {
            RoomPhase::Waiting => ServerMessage::RejoinWaiting {
                room_code: room_code.clone(),
                players: entry.room.player_infos(),
            },
            RoomPhase::Selecting => {
                let target_id = entry.room.selection_target_of(player_id);
                match target_id {
                    Some(target_id) => ServerMessage::RejoinSelecting {
                        room_code: room_code.clone(),
                        target_id,
                        target_name: entry
                            .room
                            .player(target_id)
                            .map(|p| p.identity.display_name.clone())
                            .unwrap_or_default(),
                        already_submitted: entry.room.has_submitted_word(player_id),
                        deadline_seconds: entry.selection_seconds_remaining(),
                    },
                    None => ServerMessage::RejoinWaiting {
                        room_code: room_code.clone(),
                        players: entry.room.player_infos(),
                    },
                }
            }
            RoomPhase::Playing => {
                let guesses = entry
                    .room
                    .player(player_id)
                    .map(|p| p.guesses.clone())
                    .unwrap_or_default();
                let word_length = entry
                    .room
                    .player(player_id)
                    .ok()
                    .and_then(|p| p.target_word.as_ref())
                    .map(|w| w.chars().count() as u32)
                    .unwrap_or(0);
                ServerMessage::RejoinGame {
                    room_code: room_code.clone(),
                    word_length,
                    guesses,
                    players: entry.room.player_infos(),
                    game_time_ms: entry.room.elapsed_ms(),
                }
            }
            RoomPhase::Finished => ServerMessage::RejoinResults {
                room_code: room_code.clone(),
                word: entry.room.target_word.clone(),
                results: entry.room.standings().to_vec(),
            },
        };

        let mut outbox = Outbox::default();
        let others: Vec<PlayerId> = entry
            .room
            .player_ids()
            .into_iter()
            .filter(|id| *id != player_id)
            .collect();
        outbox.push_all(&others, ServerMessage::PlayerReconnected { player_id });
        state.player_to_room.insert(player_id, room_code.clone());
        drop(state);

        // A still-open tab for the same player loses to the rejoin. Closing
        // it before the rebind keeps its teardown from touching the player.
        if let Some(stale) = self.connections.connection_for_player(player_id).await {
            if stale != connection_id {
                self.connections.close_player_connection(player_id).await;
            }
        }
        self.connections.bind_player(connection_id, player_id).await;
        info!("Player {} rejoined room {}", player_id, room_code);
        self.connections
            .send_to_connection(connection_id, snapshot)
            .await;
        outbox.deliver(&self.connections).await;
    }

    async fn rejoin_failed(&self, connection_id: ConnectionId, reason: RejoinFailReason) {
        self.connections
            .send_to_connection(connection_id, ServerMessage::RejoinFailed { reason })
            .await;
    }

    pub async fn leave_room(&self, connection_id: ConnectionId) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(room_code) = state.player_to_room.get(&player_id).cloned() else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };

        // A mid-game leave from a single-attempt challenge hands the client
        // its guesses back, so the attempt is not silently lost.
        let guesses = state
            .rooms
            .get(&room_code)
            .filter(|e| e.room.phase == RoomPhase::Playing && e.room.is_challenge())
            .and_then(|e| e.room.player(player_id).ok())
            .map(|p| p.guesses.clone());

        let mut outbox = Outbox::default();
        outbox.push(player_id, ServerMessage::RoomLeft { guesses });
        let persist = self.remove_member_locked(&mut state, &room_code, player_id, &mut outbox);
        drop(state);

        outbox.deliver(&self.connections).await;
        self.connections.unbind_player(player_id).await;
        if let Some(persist) = persist {
            self.spawn_game_end_persist(persist);
        }
    }

    pub async fn close_room(&self, connection_id: ConnectionId) {
        let Some(player_id) = self.require_player(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(room_code) = state.player_to_room.get(&player_id).cloned() else {
            drop(state);
            self.send_error(connection_id, "You are not in a room").await;
            return;
        };
        let Some(entry) = state.rooms.get(&room_code) else {
            drop(state);
            self.send_error(connection_id, "Room not found").await;
            return;
        };
        if entry.room.creator_id != player_id {
            drop(state);
            self.send_error(connection_id, RoomError::NotCreator.to_string())
                .await;
            return;
        }

        let members = entry.room.player_ids();
        let mut outbox = Outbox::default();
        outbox.push_all(
            &members,
            ServerMessage::RoomClosed {
                reason: "Closed by the room creator".to_string(),
            },
        );
        for member in &members {
            state.player_to_room.remove(member);
        }
        // Dropping the entry aborts every outstanding room timer.
        state.rooms.remove(&room_code);
        drop(state);

        info!("Room {} closed by its creator", room_code);
        outbox.deliver(&self.connections).await;
        for member in members {
            self.connections.unbind_player(member).await;
        }
    }

    // --- disconnects ---

    /// Transport teardown. Marks the player disconnected, announces the
    /// grace period, and schedules removal.
    pub async fn handle_disconnect(self: Arc<Self>, connection_id: ConnectionId) {
        let Some(player_id) = self.connections.remove_connection(connection_id).await else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(room_code) = state.player_to_room.get(&player_id).cloned() else {
            return;
        };
        let Some(entry) = state.rooms.get_mut(&room_code) else {
            return;
        };
        match entry.room.mark_disconnected(player_id) {
            Ok(true) => {}
            // Already marked, or no longer a member.
            Ok(false) | Err(_) => return,
        }

        let grace_seconds = if entry.room.is_solo() {
            self.config.grace_solo_seconds
        } else {
            match entry.room.phase {
                RoomPhase::Waiting => self.config.grace_waiting_seconds,
                RoomPhase::Selecting | RoomPhase::Playing => self.config.grace_playing_seconds,
                RoomPhase::Finished => self.config.grace_finished_seconds,
            }
        };

        let mut outbox = Outbox::default();
        let others: Vec<PlayerId> = entry
            .room
            .player_ids()
            .into_iter()
            .filter(|id| *id != player_id)
            .collect();
        outbox.push_all(
            &others,
            ServerMessage::PlayerDisconnected {
                player_id,
                grace_period_seconds: grace_seconds,
            },
        );
        entry.timers.removals.insert(
            player_id,
            spawn_grace_removal(self.clone(), room_code.clone(), player_id, grace_seconds),
        );

        // End only when someone is still around to see the results; a fully
        // disconnected room keeps its state for rejoins until grace lapses.
        let mut persist = None;
        if entry.room.all_players_resolved() && entry.room.connected_count() > 0 {
            persist = Some(self.end_game_locked(entry, &mut outbox));
        }
        drop(state);

        info!(
            "Player {} disconnected from room {}, {}s grace",
            player_id, room_code, grace_seconds
        );
        outbox.deliver(&self.connections).await;
        if let Some(persist) = persist {
            self.spawn_game_end_persist(persist);
        }
    }

    /// Grace expiry: drop the player for good unless they came back.
    pub async fn finalize_removal(&self, room_code: &str, player_id: PlayerId) {
        let mut state = self.state.write().await;
        let Some(entry) = state.rooms.get_mut(room_code) else {
            return;
        };
        if let Some(handle) = entry.timers.removals.remove(&player_id) {
            handle.disarm();
        }
        match entry.room.player(player_id) {
            Ok(player) if !player.connected => {}
            // Rejoined in time, or already gone.
            _ => return,
        }

        let mut outbox = Outbox::default();
        let persist = self.remove_member_locked(&mut state, room_code, player_id, &mut outbox);
        drop(state);

        info!(
            "Player {} removed from room {} after grace period",
            player_id, room_code
        );
        outbox.deliver(&self.connections).await;
        if let Some(persist) = persist {
            self.spawn_game_end_persist(persist);
        }
    }

    /// Shared removal path for voluntary leaves and lapsed grace periods.
    /// Handles creator promotion, room destruction, and the end-of-game
    /// checks a departure can trigger.
    fn remove_member_locked(
        &self,
        state: &mut RegistryState,
        room_code: &str,
        player_id: PlayerId,
        outbox: &mut Outbox,
    ) -> Option<GameEndPersist> {
        let entry = state.rooms.get_mut(room_code)?;
        if let Some(handle) = entry.timers.removals.remove(&player_id) {
            handle.cancel();
        }
        entry.room.remove_player(player_id).ok()?;
        state.player_to_room.remove(&player_id);

        let entry = state.rooms.get_mut(room_code)?;
        if entry.room.is_empty() {
            state.rooms.remove(room_code);
            info!("Room {} destroyed, last member left", room_code);
            return None;
        }

        let new_creator_id = entry.room.promote_creator();
        outbox.push_all(
            &entry.room.player_ids(),
            ServerMessage::PlayerLeft {
                player_id,
                new_creator_id,
            },
        );

        // A multiplayer game cannot go on alone; a solo game always can.
        let abandoned = entry.room.phase == RoomPhase::Playing
            && entry.room.started_player_count > 1
            && entry.room.connected_count() <= 1;
        let resolved = entry.room.all_players_resolved() && entry.room.connected_count() > 0;
        if abandoned || resolved {
            return Some(self.end_game_locked(entry, outbox));
        }
        None
    }

    // --- game end ---

    /// Rank, announce, and snapshot persistence for a finishing game. Runs
    /// under the registry lock; everything sent or awaited later comes out
    /// in the outbox and the returned snapshot.
    fn end_game_locked(&self, entry: &mut RoomEntry, outbox: &mut Outbox) -> GameEndPersist {
        if let Some(handle) = entry.timers.sync.take() {
            handle.cancel();
        }
        if let Some(handle) = entry.timers.countdown.take() {
            handle.cancel();
        }
        if let Some(handle) = entry.timers.selection_deadline.take() {
            handle.cancel();
        }
        entry.selection_deadline_at = None;

        let standings = entry.room.finish_game();
        let word = entry.room.target_word.clone();
        let word_assignments = match entry.room.word_mode {
            WordMode::Sabotage => Some(entry.room.assignments().to_vec()),
            _ => None,
        };

        outbox.push_all(
            &entry.room.player_ids(),
            ServerMessage::GameEnded {
                word: word.clone(),
                results: standings.clone(),
                word_assignments,
            },
        );

        let results: Vec<(FinalStanding, Option<String>)> = standings
            .iter()
            .map(|standing| {
                let email = entry
                    .room
                    .player(standing.player_id)
                    .ok()
                    .and_then(|p| p.identity.email.clone());
                (standing.clone(), email)
            })
            .collect();

        let daily = match (entry.room.daily_number, &word) {
            (Some(n), Some(word)) if entry.room.is_challenge() => {
                let completions: Vec<DailyCompletion> = results
                    .iter()
                    .filter_map(|(standing, email)| {
                        email.as_ref().map(|email| DailyCompletion {
                            email: email.clone(),
                            won: standing.won,
                            guess_count: standing.guess_count,
                            solve_time_ms: standing.solve_time_ms,
                        })
                    })
                    .collect();
                Some((n, word.clone(), completions))
            }
            _ => None,
        };

        info!("Room {} game ended", entry.room.code);
        GameEndPersist {
            game_id: entry.room.db_game_id,
            word,
            results,
            daily,
        }
    }

    fn spawn_game_end_persist(&self, persist: GameEndPersist) {
        let stats = self.stats.clone();
        tokio::spawn(async move {
            if let Some(game_id) = persist.game_id {
                stats
                    .save_game_results(game_id, persist.word.clone(), &persist.results)
                    .await;
            }
            if let Some((daily_number, word, completions)) = persist.daily {
                stats
                    .save_daily_completions(daily_number, word, &completions)
                    .await;
            }
        });
    }

    /// Deliver a message to every member of a room.
    pub async fn broadcast_to_room(&self, room_code: &str, message: ServerMessage) {
        let state = self.state.read().await;
        let Some(entry) = state.rooms.get(room_code) else {
            return;
        };
        let player_ids = entry.room.player_ids();
        drop(state);
        self.connections.send_to_players(&player_ids, message).await;
    }
}

fn entry_for_player<'a>(
    state: &'a mut RegistryState,
    player_id: PlayerId,
) -> Option<&'a mut RoomEntry> {
    let room_code = state.player_to_room.get(&player_id)?.clone();
    state.rooms.get_mut(&room_code)
}

fn coded_entry_for_player<'a>(
    state: &'a mut RegistryState,
    player_id: PlayerId,
) -> Option<(String, &'a mut RoomEntry)> {
    let room_code = state.player_to_room.get(&player_id)?.clone();
    let entry = state.rooms.get_mut(&room_code)?;
    Some((room_code, entry))
}

/// A fresh 6-letter room code, retried until it misses every live room.
fn generate_room_code(rooms: &HashMap<String, RoomEntry>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let code: String = (0..ROOM_CODE_LENGTH)
            .map(|_| (b'A' + rng.gen_range(0..26)) as char)
            .collect();
        if !rooms.contains_key(&code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_shape() {
        let rooms = HashMap::new();
        let code = generate_room_code(&rooms);
        assert_eq!(code.len(), ROOM_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_uppercase()));
    }
}
