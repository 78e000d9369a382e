use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use atlas_types::{ClientMessage, PlayerId};

use crate::session::SessionEngine;

pub mod connection;
pub mod handlers;
pub mod rate_limiter;

pub use connection::ConnectionManager;
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    engine: Arc<SessionEngine>,
) {
    let player_id: PlayerId = Uuid::new_v4();
    info!(player = %player_id, "new WebSocket connection");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let rate_limiter = RateLimiter::new();

    // Register the connection and get the receiver for outgoing messages
    let message_receiver = connection_manager.create_connection(player_id).await;

    let message_handler = MessageHandler::new(player_id, connection_manager.clone(), engine);

    // Incoming: client events -> engine
    let incoming_handler = {
        let message_handler = message_handler.clone();
        let mut rate_limiter = rate_limiter.clone();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) =
                            handle_message(msg, &mut rate_limiter, &message_handler, player_id)
                                .await
                        {
                            error!(player = %player_id, error = %e, "error handling message");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player = %player_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    };

    // Outgoing: engine notifications -> client
    let outgoing_handler = {
        async move {
            let mut receiver = message_receiver;

            while let Some(message) = receiver.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("failed to serialize message: {:?}", e);
                        continue;
                    }
                };

                if let Err(e) = ws_sender.send(Message::text(json)).await {
                    warn!(player = %player_id, "failed to send message: {:?}", e);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!(player = %player_id, "connection closed");
    message_handler.handle_disconnect().await;
    connection_manager.remove_connection(player_id).await;
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    player_id: PlayerId,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !rate_limiter.allow() {
        warn!(player = %player_id, "rate limit exceeded");
        return Err("Rate limit exceeded".into());
    }

    // Only handle text frames; pings and binary are ignored
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    let client_message: ClientMessage =
        serde_json::from_str(text).map_err(|e| format!("Invalid JSON message: {}", e))?;

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))?;

    Ok(())
}
