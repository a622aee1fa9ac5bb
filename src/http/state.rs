use crate::call::CallRegistry;
use crate::nats::TranscriptArchiver;
use std::sync::Arc;

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    /// The call coordinator (call-id → call state)
    pub registry: Arc<CallRegistry>,

    /// Optional NATS hand-off for saved transcripts
    pub archiver: Option<Arc<TranscriptArchiver>>,

    /// Bound on each connection's outbound event queue
    pub send_queue: usize,
}

impl AppState {
    pub fn new(send_queue: usize) -> Self {
        Self {
            registry: Arc::new(CallRegistry::new()),
            archiver: None,
            send_queue,
        }
    }

    pub fn with_archiver(mut self, archiver: Arc<TranscriptArchiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(256)
    }
}
