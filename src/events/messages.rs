use crate::call::TranscriptEntry;
use serde::{Deserialize, Serialize};

/// Events a connected client may send.
///
/// Decoded at the WebSocket boundary before anything reaches the
/// coordinator; malformed payloads are logged and dropped. Connection loss
/// has no event of its own, it is the transport closing the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Attach to a call, creating it if needed
    JoinCall {
        call_id: String,
        participant_id: String,
        display_name: String,
    },

    /// One recognized speech fragment, interim or final
    TranscriptFragment {
        call_id: String,
        participant_id: String,
        text: String,
        is_final: bool,
    },

    /// Explicit detach from a call
    LeaveCall {
        call_id: String,
        participant_id: String,
    },
}

/// Events the server pushes to client connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full transcript history, unicast to a connection when it joins
    ReplaySnapshot { entries: Vec<TranscriptEntry> },

    /// One accepted fragment, broadcast to every participant of the call
    TranscriptBroadcast { entry: TranscriptEntry },
}
