use super::session::{AppendError, CallSession, ConnectionHandle, ConnectionId};
use super::transcript::{CallStatus, TranscriptEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Owns the call-id → call mapping.
///
/// The registry lock is held only for map access; every mutation on a
/// single call serializes through that call's own mutex, so unrelated calls
/// proceed in parallel. Teardown holds the write lock across the
/// emptiness check and removal, which closes the race between destroying a
/// call and a join arriving for the same id.
pub struct CallRegistry {
    calls: RwLock<HashMap<String, Arc<CallSession>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a call, creating empty state if absent. Concurrent callers
    /// racing on an unseen id observe exactly one creation.
    pub async fn ensure_call(&self, call_id: &str) -> Arc<CallSession> {
        {
            let calls = self.calls.read().await;
            if let Some(call) = calls.get(call_id) {
                return Arc::clone(call);
            }
        }

        let mut calls = self.calls.write().await;
        Arc::clone(calls.entry(call_id.to_string()).or_insert_with(|| {
            info!(call_id, "Creating call");
            Arc::new(CallSession::new(call_id.to_string()))
        }))
    }

    /// Read-only lookup; never creates state.
    pub async fn get(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.calls.read().await.get(call_id).map(Arc::clone)
    }

    /// Number of active calls, for the health endpoint.
    pub async fn active_calls(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Register a participant in a call. The transcript history is unicast
    /// to the joining connection under the call lock (so it always precedes
    /// any subsequent broadcast) and also returned to the caller.
    ///
    /// If the looked-up session was torn down between lookup and join, the
    /// loop retries: the closed entry is already out of the map by the time
    /// `try_join` observes the flag, so the retry creates a fresh call.
    pub async fn join(
        &self,
        call_id: &str,
        participant_id: &str,
        display_name: &str,
        connection: ConnectionHandle,
    ) -> Vec<TranscriptEntry> {
        loop {
            let call = self.ensure_call(call_id).await;
            if let Some(snapshot) = call
                .try_join(participant_id, display_name, connection.clone())
                .await
            {
                debug!(call_id, participant_id, "Participant joined");
                return snapshot;
            }
        }
    }

    /// Remove a participant and tear the call down if it is now empty.
    /// Stale or duplicate leaves are no-ops.
    pub async fn leave(&self, call_id: &str, participant_id: &str) {
        let Some(call) = self.get(call_id).await else {
            debug!(call_id, participant_id, "Dropping leave for unknown call");
            return;
        };
        if call.leave(participant_id).await {
            debug!(call_id, participant_id, "Participant left");
        }
        self.remove_if_empty(call_id).await;
    }

    /// Destroy the call's state if it currently has zero participants.
    ///
    /// Runs under the registry write lock so no join can slip in between
    /// the emptiness check and the removal; a joiner that already holds the
    /// session Arc sees the closed flag and recreates the call instead.
    pub async fn remove_if_empty(&self, call_id: &str) {
        let mut calls = self.calls.write().await;
        let Some(call) = calls.get(call_id).map(Arc::clone) else {
            return;
        };
        if call.close_if_empty().await {
            calls.remove(call_id);
            info!(call_id, "Call ended, state destroyed");
        }
    }

    /// Connection-drop hook: remove every participant bound to this
    /// connection, wherever it joined, and tear down emptied calls.
    pub async fn leave_by_connection(&self, connection_id: ConnectionId) {
        let snapshot: Vec<(String, Arc<CallSession>)> = {
            let calls = self.calls.read().await;
            calls
                .iter()
                .map(|(id, call)| (id.clone(), Arc::clone(call)))
                .collect()
        };

        for (call_id, call) in snapshot {
            let removed = call.remove_connection(connection_id).await;
            if !removed.is_empty() {
                debug!(
                    call_id = %call_id,
                    connection_id = %connection_id,
                    removed = removed.len(),
                    "Removed participants for dropped connection"
                );
                self.remove_if_empty(&call_id).await;
            }
        }
    }

    /// Ingest a transcript fragment and fan it out to the call's
    /// participants. Fragments for unknown calls or unregistered
    /// participants come back as errors for the boundary to drop.
    pub async fn append(
        &self,
        call_id: &str,
        participant_id: &str,
        text: String,
        is_final: bool,
    ) -> Result<TranscriptEntry, AppendError> {
        let Some(call) = self.get(call_id).await else {
            return Err(AppendError::UnknownCall);
        };
        call.append(participant_id, text, is_final).await
    }

    /// Status for the read-only query path. Unknown calls report the empty
    /// shape, never an error.
    pub async fn status(&self, call_id: &str) -> CallStatus {
        match self.get(call_id).await {
            Some(call) => call.status().await,
            None => CallStatus::empty(call_id),
        }
    }
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}
