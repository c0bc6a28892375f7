use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::session_directory::SharedDirectory;
use minefinder_types::ClientMessage;

pub mod connection;
pub mod handlers;
pub mod rate_limiter;


pub use connection::{ConnectionId, ConnectionManager};
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// Per-connection inbound limits.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub burst: u32,
    pub refill: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            burst: 30,
            refill: Duration::from_millis(100),
        }
    }
}

pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    directory: SharedDirectory,
    rate_limits: RateLimitSettings,
) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let mut rate_limiter = RateLimiter::new_with_limits(rate_limits.burst, rate_limits.refill);

    let message_receiver = connection_manager.create_connection(connection_id).await;
    let message_handler = MessageHandler::new(connection_id, connection_manager.clone(), directory);

    let incoming_handler = {
        let message_handler = message_handler.clone();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) =
                            handle_message(msg, &mut rate_limiter, &message_handler, connection_id)
                                .await
                        {
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

    // Ends when the connection is dropped from the manager, which is how the
    // idle cleanup closes a socket.
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
        let _ = ws_sender.close().await;
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
    connection_manager.remove_connection(connection_id).await;
}

/// Errors returned here close the connection.
async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !rate_limiter.check_rate_limit() {
        warn!("Rate limit exceeded for connection {}", connection_id);
        return Err("Rate limit exceeded".into());
    }

    if msg.is_close() {
        return Err("Client closed the connection".into());
    }
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    // A malformed frame is answered but does not cost the connection.
    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Invalid JSON from {}: {}", connection_id, e);
            message_handler
                .send_error(&format!("Invalid message: {}", e))
                .await?;
            return Ok(());
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))?;

    Ok(())
}
