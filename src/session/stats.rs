use serde::{Deserialize, Serialize};

use super::session::SessionState;

/// Snapshot of the controller and its current session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Lifecycle state
    pub state: SessionState,

    /// Current session, if one has been recorded or loaded
    pub session_id: Option<String>,

    /// Session clock in seconds
    pub elapsed_secs: f64,

    /// Samples accumulated (all channels)
    pub recorded_samples: usize,

    /// Duration of the accumulated audio
    pub recorded_secs: f64,

    /// Number of timeline events
    pub event_count: usize,

    /// Whether capture contributes to recordings
    pub microphone_enabled: bool,

    /// Selected capture device
    pub microphone: Option<String>,

    /// Playback clock while playing
    pub playback_secs: Option<f64>,
}
