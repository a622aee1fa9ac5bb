//! WebSocket transport: one task pair per client connection.
//!
//! The socket is split into a reader and a writer. The writer drains a
//! bounded outbound queue into JSON text frames; the call coordinator only
//! ever sees the queue's sender, so a slow or dead connection can never
//! stall a broadcast. The reader decodes `ClientEvent`s and drives the
//! registry. When the stream ends for any reason, the connection's
//! participant registrations are released via `leave_by_connection`.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::call::{CallRegistry, ConnectionHandle, ConnectionId};
use crate::events::{ClientEvent, ServerEvent};

/// Handle one client connection until it closes.
pub async fn handle_socket(socket: WebSocket, registry: Arc<CallRegistry>, send_queue: usize) {
    let connection_id = ConnectionId::new();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(send_queue);
    debug!(connection_id = %connection_id, "WebSocket client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode outbound event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let connection = ConnectionHandle {
        id: connection_id,
        tx,
    };

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => dispatch(event, &registry, &connection).await,
                Err(e) => {
                    debug!(connection_id = %connection_id, "Ignoring malformed event: {}", e);
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            // Pings are answered at the protocol layer; binary is not part
            // of the wire contract.
            _ => {}
        }
    }

    registry.leave_by_connection(connection_id).await;

    // Dropping our sender lets the writer drain and exit once the
    // registry's copies are gone too.
    drop(connection);
    let _ = writer.await;

    debug!(connection_id = %connection_id, "WebSocket client disconnected");
}

async fn dispatch(event: ClientEvent, registry: &CallRegistry, connection: &ConnectionHandle) {
    match event {
        ClientEvent::JoinCall {
            call_id,
            participant_id,
            display_name,
        } => {
            // The replay snapshot is unicast to this connection by the call
            // itself, under the call lock, so no broadcast can outrun it.
            let entries = registry
                .join(&call_id, &participant_id, &display_name, connection.clone())
                .await;
            debug!(call_id = %call_id, replayed = entries.len(), "Participant joined");
        }
        ClientEvent::TranscriptFragment {
            call_id,
            participant_id,
            text,
            is_final,
        } => {
            // Fire-and-forget: stale fragments from torn-down calls or
            // departed participants are dropped without a reply.
            match registry.append(&call_id, &participant_id, text, is_final).await {
                Ok(entry) => {
                    debug!(call_id = %call_id, entry_id = entry.entry_id, "Accepted transcript fragment");
                }
                Err(e) => {
                    debug!(call_id = %call_id, "Dropping transcript fragment: {}", e);
                }
            }
        }
        ClientEvent::LeaveCall {
            call_id,
            participant_id,
        } => {
            registry.leave(&call_id, &participant_id).await;
        }
    }
}
