//! WebSocket stream endpoint
//!
//! `GET /stream?topic=<name>` upgrades to a WebSocket and subscribes a
//! [`StreamClient`] to the topic with tail semantics. Every record the
//! dispatch loop delivers is forwarded as one JSON text frame. The
//! subscription is removed as soon as either side of the socket closes.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::StreamClient;
use crate::transport::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Defaults to the server's default topic.
    pub topic: Option<String>,
}

pub async fn stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let topic = query
        .topic
        .filter(|topic| !topic.trim().is_empty())
        .unwrap_or_else(|| state.topic.clone());
    ws.on_upgrade(move |socket| handle_socket(socket, state, topic))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, topic: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create channel for this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client = StreamClient::new(tx);
    let client_id = client.id.clone();
    let subscription = state.broker.subscribe(&topic, client);
    info!(client = %client_id, topic = %topic, "stream client connected");

    // Forward delivered records to the socket
    let forward_id = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if let Err(e) = ws_sender.send(WsMessage::Text(json.into())).await {
                debug!(client = %forward_id, error = %e, "stream send failed");
                break;
            }
        }
    });

    // Clients do not send anything meaningful; just watch for the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if matches!(msg, WsMessage::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.broker.unsubscribe(&subscription);
    info!(client = %client_id, topic = %topic, "stream client disconnected");
}
