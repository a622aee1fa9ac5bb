//! HTTP API server and WebSocket entry point
//!
//! This module provides the outward-facing surface of the coordinator:
//! - GET /ws - WebSocket upgrade for participant connections
//! - GET /health - Health check with active call count
//! - GET /calls/:id/transcript - Transcript and participant count
//! - POST /calls/:id/save - Fire-and-forget persistence hand-off

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
