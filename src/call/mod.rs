//! Call session coordination
//!
//! This module provides the coordinator core:
//! - `CallRegistry`: the call-id → call mapping with lifecycle management
//! - `CallSession`: per-call participant directory and transcript log
//! - `TranscriptEntry` / `CallStatus`: the transcript data model

mod registry;
mod session;
mod transcript;

pub use registry::CallRegistry;
pub use session::{AppendError, CallSession, ConnectionHandle, ConnectionId, Participant};
pub use transcript::{CallStatus, TranscriptEntry};
