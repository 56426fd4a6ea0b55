//! HTTP API server for external control
//!
//! This module provides a REST API over the session engine:
//! - POST /recording/start | /recording/stop | /recording/toggle
//! - POST /microphone/toggle | /microphone/cycle
//! - POST /events - Record a timeline event
//! - POST /playback/play | /playback/stop | /playback/toggle
//! - GET /sessions, POST /sessions/:id/load, DELETE /sessions/:id
//! - GET /status, GET /health

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
