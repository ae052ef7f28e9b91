use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Pipeline admission
        .route("/recordings", post(handlers::submit_recording))
        // Recording queries
        .route(
            "/recordings/:recording_id/status",
            get(handlers::get_recording_status),
        )
        .route(
            "/recordings/:recording_id/transcript",
            get(handlers::get_transcript),
        )
        .route(
            "/recordings/:recording_id/transcript.srt",
            get(handlers::get_transcript_srt),
        )
        .route(
            "/recordings/:recording_id/transcript.vtt",
            get(handlers::get_transcript_vtt),
        )
        .route(
            "/recordings/:recording_id/speakers",
            get(handlers::get_speakers),
        )
        // Usage accounting
        .route("/users/:user_id/usage", get(handlers::get_usage_summary))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
