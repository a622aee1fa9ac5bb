pub mod call;
pub mod config;
pub mod events;
pub mod http;
pub mod nats;
pub mod ws;

pub use call::{
    AppendError, CallRegistry, CallSession, CallStatus, ConnectionHandle, ConnectionId,
    Participant, TranscriptEntry,
};
pub use config::Config;
pub use events::{ClientEvent, ServerEvent};
pub use http::{create_router, AppState};
pub use nats::{TranscriptArchiveMessage, TranscriptArchiver};
