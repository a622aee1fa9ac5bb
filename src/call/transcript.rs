use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted utterance fragment in a call's transcript log.
///
/// Entries are immutable once appended; the log never reorders or deletes
/// them. `participant_name` is a copy of the display name at submission
/// time, so later renames do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    /// Per-call sequence number, strictly increasing
    pub entry_id: u64,

    /// Who said it
    pub participant_id: String,

    /// Display name at the time of submission
    pub participant_name: String,

    /// Recognized text
    pub text: String,

    /// Server-side ingestion time
    pub timestamp: DateTime<Utc>,

    /// Whether this is the finalized recognition result or an interim update
    pub is_final: bool,
}

/// Read-only view of a call served by the HTTP transcript query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatus {
    pub call_id: String,
    pub transcripts: Vec<TranscriptEntry>,
    pub participant_count: usize,
}

impl CallStatus {
    /// The shape reported for a call with no current state. Unknown call
    /// ids are not an error on the read path.
    pub fn empty(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            transcripts: Vec::new(),
            participant_count: 0,
        }
    }
}
