use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        // Devices
        .route("/sessions/:session_id/preview", post(handlers::preview))
        .route("/sessions/:session_id/retry", post(handlers::retry))
        .route("/sessions/:session_id/mode", post(handlers::set_mode))
        // Recording control
        .route(
            "/sessions/:session_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/sessions/:session_id/record/stop",
            post(handlers::stop_recording),
        )
        .route(
            "/sessions/:session_id/record/cancel",
            post(handlers::cancel_recording),
        )
        .route("/sessions/:session_id/rerecord", post(handlers::rerecord))
        // Upload and stored recording
        .route("/sessions/:session_id/upload", post(handlers::upload))
        .route(
            "/sessions/:session_id/recording",
            delete(handlers::delete_recording),
        )
        // Playback
        .route(
            "/sessions/:session_id/playback/toggle",
            post(handlers::toggle_playback),
        )
        .route("/sessions/:session_id/playback/seek", post(handlers::seek))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
