use super::transcript::{CallStatus, TranscriptEntry};
use crate::events::ServerEvent;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// Identity of one live WebSocket connection.
///
/// Deliberately distinct from participant identity: a participant may
/// reconnect with a new connection while keeping the same participant id,
/// and a connection may drop without ever sending an explicit leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sender half of a connection's outbound event queue. The transport layer
/// owns the connection; the call only holds this handle for fan-out.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

/// One registered member of a call.
#[derive(Debug, Clone)]
pub struct Participant {
    pub display_name: String,
    pub connection: ConnectionHandle,
}

/// Why a transcript fragment was not accepted.
///
/// Both cases are normal races with call teardown or a late leave; the
/// boundary drops them silently and never reports a failure to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AppendError {
    #[error("call has no current state")]
    UnknownCall,

    #[error("participant is not registered in the call")]
    UnknownParticipant,
}

/// Mutable state of one call, guarded by the session's mutex.
struct CallInner {
    participants: HashMap<String, Participant>,
    transcripts: Vec<TranscriptEntry>,
    next_entry_id: u64,
    /// Set once by the registry during teardown; joiners that observe it
    /// retry through `ensure_call` and get a fresh session.
    closed: bool,
}

/// State of one active call: its participant directory and transcript log.
///
/// All mutations on a call serialize through the inner mutex, so a join and
/// a concurrent leave cannot corrupt the directory and two appends cannot
/// interleave or skip an entry id. Unrelated calls never contend here.
pub struct CallSession {
    id: String,
    started_at: DateTime<Utc>,
    inner: Mutex<CallInner>,
}

impl CallSession {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            inner: Mutex::new(CallInner {
                participants: HashMap::new(),
                transcripts: Vec::new(),
                next_entry_id: 0,
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Register (or re-register) a participant and unicast the replay
    /// snapshot to the joining connection. A rejoin with the same id
    /// overwrites the stale registration; transcript history is untouched.
    ///
    /// The snapshot is enqueued while the lock is still held, so a
    /// concurrent `append` cannot slip a broadcast into the joiner's queue
    /// ahead of the history it belongs after.
    ///
    /// Returns `None` if the call was torn down concurrently. The registry
    /// retries the lookup in that case.
    pub(crate) async fn try_join(
        &self,
        participant_id: &str,
        display_name: &str,
        connection: ConnectionHandle,
    ) -> Option<Vec<TranscriptEntry>> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return None;
        }

        let snapshot = inner.transcripts.clone();
        let replay = ServerEvent::ReplaySnapshot {
            entries: snapshot.clone(),
        };
        if let Err(e) = connection.tx.try_send(replay) {
            warn!(
                call_id = %self.id,
                participant_id = %participant_id,
                "Failed to deliver replay snapshot: {}",
                e
            );
        }

        inner.participants.insert(
            participant_id.to_string(),
            Participant {
                display_name: display_name.to_string(),
                connection,
            },
        );
        Some(snapshot)
    }

    /// Remove a participant. Duplicate or unknown leaves are no-ops.
    pub async fn leave(&self, participant_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        inner.participants.remove(participant_id).is_some()
    }

    /// Remove every participant bound to a dropped connection, returning
    /// the removed participant ids.
    pub(crate) async fn remove_connection(&self, connection_id: ConnectionId) -> Vec<String> {
        let mut inner = self.inner.lock().await;
        let removed: Vec<String> = inner
            .participants
            .iter()
            .filter(|(_, p)| p.connection.id == connection_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            inner.participants.remove(id);
        }
        removed
    }

    /// Ingest a fragment: assign an entry id and timestamp, append it to
    /// the log, and fan it out to every current participant including the
    /// sender (the sender's own UI is driven by the server echo).
    ///
    /// Fan-out runs after the entry is recorded, while the lock is still
    /// held; `try_send` never blocks, and holding the lock keeps broadcasts
    /// in log order on every connection. A full or closed recipient queue
    /// is logged and skipped without affecting the other recipients.
    pub async fn append(
        &self,
        participant_id: &str,
        text: String,
        is_final: bool,
    ) -> Result<TranscriptEntry, AppendError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(AppendError::UnknownCall);
        }

        let participant_name = match inner.participants.get(participant_id) {
            Some(p) => p.display_name.clone(),
            None => return Err(AppendError::UnknownParticipant),
        };

        let entry = TranscriptEntry {
            entry_id: inner.next_entry_id,
            participant_id: participant_id.to_string(),
            participant_name,
            text,
            timestamp: Utc::now(),
            is_final,
        };
        inner.next_entry_id += 1;
        inner.transcripts.push(entry.clone());

        for (recipient_id, participant) in inner.participants.iter() {
            let event = ServerEvent::TranscriptBroadcast {
                entry: entry.clone(),
            };
            if let Err(e) = participant.connection.tx.try_send(event) {
                warn!(
                    call_id = %self.id,
                    participant_id = %recipient_id,
                    "Failed to deliver transcript broadcast: {}",
                    e
                );
            }
        }

        Ok(entry)
    }

    /// Ordered copy of the transcript log.
    pub async fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().await.transcripts.clone()
    }

    pub async fn participant_count(&self) -> usize {
        self.inner.lock().await.participants.len()
    }

    /// One consistent view of the log and membership for status queries.
    pub async fn status(&self) -> CallStatus {
        let inner = self.inner.lock().await;
        CallStatus {
            call_id: self.id.clone(),
            transcripts: inner.transcripts.clone(),
            participant_count: inner.participants.len(),
        }
    }

    /// Mark the call closed if it has no participants. Called by the
    /// registry under its write lock during teardown.
    pub(crate) async fn close_if_empty(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.participants.is_empty() && !inner.closed {
            inner.closed = true;
            true
        } else {
            false
        }
    }
}
