use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use game_types::{PlayerId, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Connection {
    player_id: Option<PlayerId>,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

/// Tracks live WebSocket connections and which player each one speaks for.
/// Dropping a connection's sender ends its outgoing pump, so closing a
/// connection is just removing it from the map.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    player_to_connection: RwLock<HashMap<PlayerId, ConnectionId>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            player_to_connection: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection and hand back the receiving end of its
    /// outgoing message queue.
    pub async fn create_connection(
        &self,
        connection_id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.connections.write().await.insert(
            connection_id,
            Connection {
                player_id: None,
                sender,
            },
        );
        receiver
    }

    /// Drop a connection. Returns the player it was bound to, if any. The
    /// reverse index is only cleared when it still points at this connection,
    /// so a rejoin that already rebound the player is left alone.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        let connection = self.connections.write().await.remove(&connection_id)?;
        let player_id = connection.player_id?;

        let mut reverse = self.player_to_connection.write().await;
        if reverse.get(&player_id) == Some(&connection_id) {
            reverse.remove(&player_id);
        }
        Some(player_id)
    }

    /// Bind a connection to a player, replacing any previous binding for
    /// that player.
    pub async fn bind_player(&self, connection_id: ConnectionId, player_id: PlayerId) {
        if let Some(connection) = self.connections.write().await.get_mut(&connection_id) {
            connection.player_id = Some(player_id);
        }
        self.player_to_connection
            .write()
            .await
            .insert(player_id, connection_id);
    }

    pub async fn player_for(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        self.connections
            .read()
            .await
            .get(&connection_id)
            .and_then(|c| c.player_id)
    }

    pub async fn connection_for_player(&self, player_id: PlayerId) -> Option<ConnectionId> {
        self.player_to_connection
            .read()
            .await
            .get(&player_id)
            .copied()
    }

    pub async fn send_to_connection(&self, connection_id: ConnectionId, message: ServerMessage) {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&connection_id) {
            if connection.sender.send(message).is_err() {
                warn!("Failed to queue message for connection {}", connection_id);
            }
        } else {
            debug!("Dropping message for unknown connection {}", connection_id);
        }
    }

    pub async fn send_to_player(&self, player_id: PlayerId, message: ServerMessage) {
        let Some(connection_id) = self.connection_for_player(player_id).await else {
            return;
        };
        self.send_to_connection(connection_id, message).await;
    }

    pub async fn send_to_players(&self, player_ids: &[PlayerId], message: ServerMessage) {
        for &player_id in player_ids {
            self.send_to_player(player_id, message.clone()).await;
        }
    }

    /// Detach a connection from its player without closing the transport,
    /// for a client that left its room but keeps the socket open.
    pub async fn unbind_player(&self, player_id: PlayerId) {
        let mut reverse = self.player_to_connection.write().await;
        let Some(connection_id) = reverse.remove(&player_id) else {
            return;
        };
        drop(reverse);
        if let Some(connection) = self.connections.write().await.get_mut(&connection_id) {
            if connection.player_id == Some(player_id) {
                connection.player_id = None;
            }
        }
    }

    /// Force-close the transport bound to a player. The dropped sender ends
    /// the connection's outgoing pump, which tears the socket down.
    pub async fn close_player_connection(&self, player_id: PlayerId) {
        let Some(connection_id) = self.connection_for_player(player_id).await else {
            return;
        };
        self.connections.write().await.remove(&connection_id);
        let mut reverse = self.player_to_connection.write().await;
        if reverse.get(&player_id) == Some(&connection_id) {
            reverse.remove(&player_id);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_send() {
        let manager = ConnectionManager::new();
        let connection_id = ConnectionId::new();
        let mut receiver = manager.create_connection(connection_id).await;

        let player_id = Uuid::new_v4();
        manager.bind_player(connection_id, player_id).await;
        assert_eq!(manager.player_for(connection_id).await, Some(player_id));

        manager
            .send_to_player(player_id, ServerMessage::AllWordsSubmitted)
            .await;
        assert!(matches!(
            receiver.recv().await,
            Some(ServerMessage::AllWordsSubmitted)
        ));
    }

    #[tokio::test]
    async fn test_remove_returns_bound_player() {
        let manager = ConnectionManager::new();
        let connection_id = ConnectionId::new();
        let _receiver = manager.create_connection(connection_id).await;
        let player_id = Uuid::new_v4();
        manager.bind_player(connection_id, player_id).await;

        assert_eq!(
            manager.remove_connection(connection_id).await,
            Some(player_id)
        );
        assert_eq!(manager.connection_for_player(player_id).await, None);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_removal_keeps_new_binding() {
        let manager = ConnectionManager::new();
        let player_id = Uuid::new_v4();

        let old = ConnectionId::new();
        let _old_rx = manager.create_connection(old).await;
        manager.bind_player(old, player_id).await;

        // Player rejoins on a fresh connection before the old one is reaped.
        let new = ConnectionId::new();
        let _new_rx = manager.create_connection(new).await;
        manager.bind_player(new, player_id).await;

        manager.remove_connection(old).await;
        assert_eq!(manager.connection_for_player(player_id).await, Some(new));
    }

    #[tokio::test]
    async fn test_close_player_connection_ends_pump() {
        let manager = ConnectionManager::new();
        let connection_id = ConnectionId::new();
        let mut receiver = manager.create_connection(connection_id).await;
        let player_id = Uuid::new_v4();
        manager.bind_player(connection_id, player_id).await;

        manager.close_player_connection(player_id).await;
        assert!(receiver.recv().await.is_none());
        assert_eq!(manager.connection_for_player(player_id).await, None);
    }
}
