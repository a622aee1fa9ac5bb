use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Participant event stream
        .route("/ws", get(handlers::ws_upgrade))
        // Call queries
        .route(
            "/calls/:call_id/transcript",
            get(handlers::get_call_transcript),
        )
        // Persistence hand-off
        .route("/calls/:call_id/save", post(handlers::save_transcript))
        // Request logging; permissive CORS for browser clients
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
