use super::state::AppState;
use crate::error::SessionError;
use crate::session::SessionStats;
use crate::timeline::{EventKind, EventPayload, TimelineEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MicrophoneResponse {
    pub enabled: bool,
    pub device: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub kind: EventKind,
    pub identifier: String,
    /// Defaults to full intensity
    pub intensity: Option<f32>,
    pub sample: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    /// False when no recording is active (the event is dropped)
    pub recorded: bool,
    pub event: Option<TimelineEvent>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned from a handler, rendered as JSON
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let status = match &e {
            SessionError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
            SessionError::CorruptSession { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::DeviceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            SessionError::StorageWriteFailure { .. } | SessionError::StorageReadFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("Request failed: {}", e);
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("Engine unavailable: {:#}", e);
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: format!("{:#}", e),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Handlers
// ============================================================================

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> ApiResult<SessionStats> {
    let stats = state.engine.call(|c| c.stats()).await?;
    Ok(Json(stats))
}

/// POST /recording/start
pub async fn start_recording(State(state): State<AppState>) -> ApiResult<StartRecordingResponse> {
    let session_id = state.engine.call(|c| c.start_recording()).await??;
    info!("Recording started: {}", session_id);

    Ok(Json(StartRecordingResponse {
        session_id,
        status: "recording".to_string(),
    }))
}

/// POST /recording/stop
/// Stops and saves the active recording
pub async fn stop_recording(State(state): State<AppState>) -> ApiResult<SessionStats> {
    let stats = state
        .engine
        .call(|c| c.stop_recording().map(|_| c.stats()))
        .await??;
    Ok(Json(stats))
}

/// POST /recording/toggle
pub async fn toggle_recording(State(state): State<AppState>) -> ApiResult<SessionStats> {
    let stats = state
        .engine
        .call(|c| c.toggle_recording().map(|_| c.stats()))
        .await??;
    Ok(Json(stats))
}

/// POST /microphone/toggle
pub async fn toggle_microphone(State(state): State<AppState>) -> ApiResult<MicrophoneResponse> {
    let (enabled, device) = state
        .engine
        .call(|c| {
            let enabled = c.toggle_microphone();
            (enabled, c.stats().microphone)
        })
        .await?;
    Ok(Json(MicrophoneResponse { enabled, device }))
}

/// POST /microphone/cycle
pub async fn cycle_microphone(State(state): State<AppState>) -> ApiResult<MicrophoneResponse> {
    let (enabled, device) = state
        .engine
        .call(|c| c.cycle_microphone().map(|device| (c.microphone_enabled(), device)))
        .await??;
    Ok(Json(MicrophoneResponse {
        enabled,
        device: Some(device),
    }))
}

/// POST /events
/// Stamp an event against the running session clock
pub async fn record_event(
    State(state): State<AppState>,
    Json(req): Json<RecordEventRequest>,
) -> ApiResult<RecordEventResponse> {
    let mut payload = EventPayload::new(req.identifier, req.intensity.unwrap_or(1.0));
    payload.sample = req.sample;

    let event = state.engine.call(move |c| c.record(req.kind, payload)).await?;
    Ok(Json(RecordEventResponse {
        recorded: event.is_some(),
        event,
    }))
}

/// POST /playback/play
pub async fn play(State(state): State<AppState>) -> ApiResult<SessionStats> {
    let stats = state
        .engine
        .call(|c| c.play_recording().map(|_| c.stats()))
        .await??;
    Ok(Json(stats))
}

/// POST /playback/stop
pub async fn stop_playback(State(state): State<AppState>) -> ApiResult<SessionStats> {
    let stats = state
        .engine
        .call(|c| c.stop_playback().map(|_| c.stats()))
        .await??;
    Ok(Json(stats))
}

/// POST /playback/toggle
pub async fn toggle_playback(State(state): State<AppState>) -> ApiResult<SessionStats> {
    let stats = state
        .engine
        .call(|c| c.toggle_playback().map(|_| c.stats()))
        .await??;
    Ok(Json(stats))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<SessionListResponse> {
    let sessions = state.engine.call(|c| c.list_recordings()).await??;
    Ok(Json(SessionListResponse { sessions }))
}

/// POST /sessions/:session_id/load
pub async fn load_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionStats> {
    let stats = state
        .engine
        .call(move |c| c.load_recording(&session_id).map(|_| c.stats()))
        .await??;
    Ok(Json(stats))
}

/// DELETE /sessions/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .call(move |c| c.delete_recording(&session_id))
        .await??;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
