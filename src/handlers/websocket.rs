//! WebSocket gateway handler
//!
//! Thin boundary between the transport and the feed service: it accepts
//! sockets, forwards their outbound channel into the transport, resolves
//! tokens to authors, and translates client requests into service calls.

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::WebSocket;

use crate::core::message::{encode_broadcast, encode_error, ClientRequest};
use crate::error::RoomcastError;
use crate::handlers::GatewayState;
use crate::transport::TransportSender;

/// Query parameters accepted on the upgrade request
#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    /// Display name; a guest name is derived when absent
    pub name: Option<String>,
}

/// Handle one WebSocket client from upgrade to close
pub async fn handle_ws_client(ws: WebSocket, query: JoinQuery, state: GatewayState) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Forward frames from the outbound channel to the socket
    tokio::task::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = ws_tx.send(frame).await {
                debug!("Failed to forward WebSocket frame: {}", e);
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4().to_string();
    let display_name = query
        .name
        .unwrap_or_else(|| format!("guest-{}", &connection_id[..8]));

    state.transport.attach(&connection_id, tx).await;

    if let Err(e) = state.service.on_join(&connection_id, &display_name).await {
        error!("Failed to register connection {}: {}", connection_id, e);
        state.transport.detach(&connection_id).await;
        return;
    }

    // Replay recent history to the joining client
    replay_history(&connection_id, &state.default_room, &state).await;

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(frame) => {
                if let Ok(raw) = frame.to_str() {
                    process_request(raw, &connection_id, &state).await;
                }
            }
            Err(e) => {
                debug!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        }
    }

    state.transport.detach(&connection_id).await;
    state.service.on_leave(&connection_id).await;
}

/// Translate one text frame into a service call
async fn process_request(raw: &str, connection_id: &str, state: &GatewayState) {
    match ClientRequest::parse(raw) {
        Ok(ClientRequest::SendMessage {
            token,
            content,
            room,
        }) => {
            let principal = match state.verifier.verify(&token) {
                Ok(principal) => principal,
                Err(e) => {
                    warn!("Token verification failed for {}: {}", connection_id, e);
                    send_error(connection_id, "Token verification failed.", state).await;
                    return;
                }
            };

            let room = room.as_deref().unwrap_or(&state.default_room);
            match state
                .service
                .on_message(room, &principal.username, &content)
                .await
            {
                Ok(summary) => {
                    info!(
                        "Message from '{}' delivered to {} connections ({} removed, {} transient)",
                        principal.username,
                        summary.delivered,
                        summary.removed.len(),
                        summary.failed_transient.len()
                    );
                }
                Err(RoomcastError::ValidationError(reason)) => {
                    send_error(connection_id, &reason, state).await;
                }
                Err(e) => {
                    error!("Failed to publish message from {}: {}", connection_id, e);
                }
            }
        }
        Ok(ClientRequest::RecentMessages { room, limit }) => {
            let room = room.unwrap_or_else(|| state.default_room.clone());
            let limit = limit
                .unwrap_or(state.history_limit)
                .min(state.history_limit);
            match state.service.on_history(&room, limit).await {
                Ok(messages) => {
                    debug!(
                        "Sending {} recent messages of '{}' to {}",
                        messages.len(),
                        room,
                        connection_id
                    );
                    push_frame(connection_id, encode_broadcast(&messages), state).await;
                }
                Err(e) => {
                    error!("Failed to fetch history for {}: {}", connection_id, e);
                }
            }
        }
        Err(e) => {
            warn!("Rejected request from {}: {}", connection_id, e);
            send_error(connection_id, &e.to_string(), state).await;
        }
    }
}

async fn replay_history(connection_id: &str, room: &str, state: &GatewayState) {
    match state.service.on_history(room, state.history_limit).await {
        Ok(messages) => push_frame(connection_id, encode_broadcast(&messages), state).await,
        Err(e) => error!("Failed to replay history to {}: {}", connection_id, e),
    }
}

async fn send_error(connection_id: &str, reason: &str, state: &GatewayState) {
    push_frame(connection_id, encode_error(reason), state).await;
}

async fn push_frame(
    connection_id: &str,
    payload: crate::error::Result<Vec<u8>>,
    state: &GatewayState,
) {
    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode frame for {}: {}", connection_id, e);
            return;
        }
    };
    if let Err(e) = state.transport.send(connection_id, &payload).await {
        debug!("Failed to push frame to {}: {}", connection_id, e);
    }
}
