use crate::call::TranscriptEntry;
use serde::{Deserialize, Serialize};

/// Archive message published when a call's transcript is handed off
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptArchiveMessage {
    pub call_id: String,
    pub entries: Vec<TranscriptEntry>,
    pub archived_at: String, // RFC3339 timestamp
}
