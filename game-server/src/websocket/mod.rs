use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use game_types::ClientMessage;

use crate::registry::RoomRegistry;

pub mod connection;
pub mod handlers;

use connection::ConnectionId;
pub use connection::ConnectionManager;
use handlers::MessageHandler;

pub async fn handle_connection(websocket: WebSocket, registry: Arc<RoomRegistry>) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let message_receiver = registry
        .connections
        .create_connection(connection_id)
        .await;
    let message_handler = MessageHandler::new(connection_id, registry.clone());

    let incoming_handler = {
        let message_handler = message_handler.clone();
        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) = handle_message(msg, &message_handler).await {
                            error!("Error handling message for {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = message_receiver;
        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
    registry.connections.remove_connection(connection_id).await;
}

async fn handle_message(
    msg: Message,
    message_handler: &MessageHandler,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;
    let client_message: ClientMessage =
        serde_json::from_str(text).map_err(|e| format!("Invalid JSON message: {}", e))?;

    message_handler.handle_message(client_message).await;
    Ok(())
}
