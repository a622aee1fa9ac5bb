use super::state::AppState;
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_calls: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTranscriptResponse {
    pub success: bool,
    pub call_id: String,
    pub saved_entries: usize,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /ws
/// Upgrade to the participant event stream
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        crate::ws::handle_socket(socket, Arc::clone(&state.registry), state.send_queue)
    })
}

/// GET /health
/// Health check with the number of active calls
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK".to_string(),
        active_calls: state.registry.active_calls().await,
    })
}

/// GET /calls/:call_id/transcript
/// Transcript and participant count for a call. An unknown call id returns
/// the empty shape, never an error.
pub async fn get_call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    Json(state.registry.status(&call_id).await)
}

/// POST /calls/:call_id/save
/// Hand the call's transcript off for durable storage. The hand-off is
/// fire-and-forget; this core makes no durability guarantee.
pub async fn save_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let status = state.registry.status(&call_id).await;
    let saved_entries = status.transcripts.len();

    match &state.archiver {
        Some(archiver) => {
            let archiver = Arc::clone(archiver);
            let call_id = call_id.clone();
            tokio::spawn(async move {
                if let Err(e) = archiver.archive(&call_id, status.transcripts).await {
                    warn!(call_id = %call_id, "Failed to archive transcript: {}", e);
                }
            });
        }
        None => {
            debug!(call_id = %call_id, "No archiver configured, transcript not handed off");
        }
    }

    info!(call_id = %call_id, saved_entries, "Transcript save requested");

    Json(SaveTranscriptResponse {
        success: true,
        call_id,
        saved_entries,
        message: "Transcript save accepted".to_string(),
    })
}
