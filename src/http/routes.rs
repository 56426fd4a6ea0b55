use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::get_status))
        // Recording control
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/toggle", post(handlers::toggle_recording))
        .route("/microphone/toggle", post(handlers::toggle_microphone))
        .route("/microphone/cycle", post(handlers::cycle_microphone))
        .route("/events", post(handlers::record_event))
        // Playback control
        .route("/playback/play", post(handlers::play))
        .route("/playback/stop", post(handlers::stop_playback))
        .route("/playback/toggle", post(handlers::toggle_playback))
        // Stored sessions
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:session_id/load", post(handlers::load_session))
        .route("/sessions/:session_id", axum::routing::delete(handlers::delete_session))
        // Request logging, and CORS so a browser pad can drive the API
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
