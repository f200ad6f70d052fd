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
        // Chunk ingestion
        .route("/interviews/chunk", post(handlers::submit_chunk))
        .route(
            "/interviews/:canvas_id/finalize",
            post(handlers::finalize_recording),
        )
        // Recording queries
        .route(
            "/interviews/:canvas_id/status",
            get(handlers::get_canvas_status),
        )
        .route(
            "/interviews/:canvas_id/transcript",
            get(handlers::get_canvas_transcript),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
