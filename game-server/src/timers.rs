use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use game_types::{PlayerId, ServerMessage};

use crate::registry::RoomRegistry;

/// Owns a spawned room task and aborts it when dropped, so replacing or
/// discarding a room entry cancels its pending timers automatically.
pub struct TimerHandle(Option<JoinHandle<()>>);

impl TimerHandle {
    fn new(handle: JoinHandle<()>) -> Self {
        Self(Some(handle))
    }

    pub fn cancel(mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }

    /// Release the task without aborting it. A timer task that removes its
    /// own handle from the room entry must disarm it, or it would cancel
    /// itself mid-run.
    pub fn disarm(mut self) {
        self.0.take();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Tick the pre-game countdown once a second, then start play.
pub fn spawn_countdown(registry: Arc<RoomRegistry>, room_code: String, from: u32) -> TimerHandle {
    TimerHandle::new(tokio::spawn(async move {
        for count in (1..=from).rev() {
            registry
                .broadcast_to_room(&room_code, ServerMessage::Countdown { count })
                .await;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        registry.begin_play(&room_code).await;
    }))
}

/// Broadcast elapsed-time snapshots every second while the room is playing.
pub fn spawn_timer_sync(registry: Arc<RoomRegistry>, room_code: String) -> TimerHandle {
    TimerHandle::new(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;
        loop {
            interval.tick().await;
            if !registry.broadcast_timer_sync(&room_code).await {
                break;
            }
        }
    }))
}

/// Fire the word-selection deadline after the configured window.
pub fn spawn_selection_deadline(
    registry: Arc<RoomRegistry>,
    room_code: String,
    deadline_seconds: u64,
) -> TimerHandle {
    TimerHandle::new(tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(deadline_seconds)).await;
        registry.selection_deadline_fired(&room_code).await;
    }))
}

/// Remove a disconnected player once their grace period lapses.
pub fn spawn_grace_removal(
    registry: Arc<RoomRegistry>,
    room_code: String,
    player_id: PlayerId,
    grace_seconds: u64,
) -> TimerHandle {
    TimerHandle::new(tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(grace_seconds)).await;
        registry.finalize_removal(&room_code, player_id).await;
    }))
}
