use std::sync::Arc;

use game_types::ClientMessage;

use crate::registry::RoomRegistry;
use crate::websocket::connection::ConnectionId;

/// Dispatches one connection's client messages onto the room registry.
#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    registry: Arc<RoomRegistry>,
}

impl MessageHandler {
    pub fn new(connection_id: ConnectionId, registry: Arc<RoomRegistry>) -> Self {
        Self {
            connection_id,
            registry,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::CreateRoom {
                name,
                email,
                game_mode,
                word_mode,
                hard_mode,
            } => {
                self.registry
                    .create_room(self.connection_id, name, email, game_mode, word_mode, hard_mode)
                    .await
            }
            ClientMessage::JoinRoom {
                room_code,
                name,
                email,
            } => {
                self.registry
                    .join_room(self.connection_id, room_code, name, email)
                    .await
            }
            ClientMessage::SetReady { ready } => {
                self.registry.set_ready(self.connection_id, ready).await
            }
            ClientMessage::StartGame => self.registry.clone().start_game(self.connection_id).await,
            ClientMessage::SubmitWord { word } => {
                self.registry
                    .clone()
                    .submit_word(self.connection_id, word)
                    .await
            }
            ClientMessage::Guess { word } => self.registry.guess(self.connection_id, word).await,
            ClientMessage::PlayAgain => self.registry.play_again(self.connection_id).await,
            ClientMessage::Rejoin {
                room_code,
                player_id,
            } => {
                self.registry
                    .rejoin(self.connection_id, room_code, player_id)
                    .await
            }
            ClientMessage::LeaveRoom => self.registry.leave_room(self.connection_id).await,
            ClientMessage::CloseRoom => self.registry.close_room(self.connection_id).await,
        }
    }

    pub async fn handle_disconnect(&self) {
        self.registry
            .clone()
            .handle_disconnect(self.connection_id)
            .await;
    }
}
