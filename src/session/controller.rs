use std::io;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::session::{Session, SessionIdGenerator, SessionState};
use super::stats::SessionStats;
use crate::audio::{wav, AudioOutput, CaptureDevice, CaptureMixer, MixReport, SoundTrigger};
use crate::error::{SessionError, SessionResult};
use crate::store::SessionStore;
use crate::timeline::{EventDocument, EventKind, EventPayload, PlaybackCursor, TimelineEvent};

/// What one call to [`SessionController::tick`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// State after the tick
    pub state: SessionState,
    /// Capture mixer outcome while recording
    pub mix: Option<MixReport>,
    /// Timeline events fired while playing
    pub dispatched: usize,
    /// Recording hit the maximum duration and was stopped on this tick
    pub reached_max_duration: bool,
    /// Playback reached the end of the session on this tick
    pub playback_finished: bool,
}

impl TickReport {
    fn idle(state: SessionState) -> Self {
        Self {
            state,
            mix: None,
            dispatched: 0,
            reached_max_duration: false,
            playback_finished: false,
        }
    }
}

/// Owns the single active session and drives it through its lifecycle
///
/// All mutation happens through `&mut self`, so the host serializes event
/// recording and ticks by owning the controller on one thread.
pub struct SessionController {
    config: SessionConfig,
    state: SessionState,
    session: Option<Session>,
    mixer: CaptureMixer,
    cursor: Option<PlaybackCursor>,
    ids: SessionIdGenerator,
    record_microphone: bool,
    selected_device: Option<String>,
    capture: Box<dyn CaptureDevice>,
    output: Box<dyn AudioOutput>,
    trigger: Box<dyn SoundTrigger>,
    store: Box<dyn SessionStore>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn CaptureDevice>,
        output: Box<dyn AudioOutput>,
        trigger: Box<dyn SoundTrigger>,
        store: Box<dyn SessionStore>,
    ) -> Self {
        info!(
            "Session controller ready: {}Hz, {} channels, max {:.0}s, output {}",
            config.sample_rate,
            config.channels,
            config.max_recording_secs,
            output.name()
        );

        Self {
            mixer: CaptureMixer::new(config.mixer_config()),
            record_microphone: config.record_microphone,
            selected_device: config.preferred_device.clone(),
            config,
            state: SessionState::Idle,
            session: None,
            cursor: None,
            ids: SessionIdGenerator::new(),
            capture,
            output,
            trigger,
            store,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn microphone_enabled(&self) -> bool {
        self.record_microphone
    }

    pub fn stats(&self) -> SessionStats {
        let session = self.session.as_ref();
        SessionStats {
            state: self.state,
            session_id: session.map(|s| s.id().to_string()),
            elapsed_secs: session.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0),
            recorded_samples: session.map(|s| s.samples().len()).unwrap_or(0),
            recorded_secs: session.map(|s| s.samples().duration_secs()).unwrap_or(0.0),
            event_count: session.map(|s| s.timeline().len()).unwrap_or(0),
            microphone_enabled: self.record_microphone,
            microphone: self
                .mixer
                .armed_device()
                .map(str::to_string)
                .or_else(|| self.selected_device.clone()),
            playback_secs: self.cursor.as_ref().map(|c| c.clock()),
        }
    }

    /// Begin a new session, replacing any stopped one
    ///
    /// Returns the new session id. Already recording is not an error.
    pub fn start_recording(&mut self) -> SessionResult<String> {
        match self.state {
            SessionState::Recording => {
                warn!("Recording already started");
                return Ok(self.session.as_ref().map(|s| s.id().to_string()).unwrap_or_default());
            }
            SessionState::Playing => {
                return Err(SessionError::InvalidTransition {
                    action: "start recording",
                    state: self.state,
                })
            }
            SessionState::Idle | SessionState::Stopped => {}
        }

        let id = self.ids.next_now();
        self.session = Some(Session::new(id.clone(), self.config.format()));
        self.cursor = None;

        if self.record_microphone {
            self.arm_microphone();
        }

        self.state = SessionState::Recording;
        info!("Started recording: {}", id);
        Ok(id)
    }

    /// Finish the session and save it
    ///
    /// The controller is Stopped afterwards even if saving fails; the session
    /// stays in memory and [`SessionController::save`] may be retried.
    pub fn stop_recording(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Recording {
            warn!("Recording not active");
            return Ok(());
        }

        self.disarm_microphone();
        self.state = SessionState::Stopped;

        if let Some(session) = &self.session {
            info!(
                "Stopped recording. Session length: {:.2} seconds, {} events",
                session.elapsed().as_secs_f64(),
                session.timeline().len()
            );
        }

        self.save()
    }

    /// Write the current stopped session to the store
    pub fn save(&self) -> SessionResult<()> {
        if self.state == SessionState::Recording {
            return Err(SessionError::InvalidTransition {
                action: "save",
                state: self.state,
            });
        }
        let Some(session) = &self.session else {
            warn!("No session to save");
            return Ok(());
        };

        let id = session.id();
        let encode_failure = |e: Box<dyn std::error::Error + Send + Sync>| {
            SessionError::StorageWriteFailure {
                id: id.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        };

        let audio = wav::encode(session.samples(), &session.format())
            .map_err(|e| encode_failure(e.into()))?;
        let events = EventDocument::new(id, session.timeline())
            .to_json()
            .map_err(|e| encode_failure(e.into()))?;

        self.store.write(id, &audio, &events).inspect_err(|e| {
            error!("Failed to save session {}: {}", id, e);
        })
    }

    /// Replace the current session with one read from the store
    pub fn load_recording(&mut self, id: &str) -> SessionResult<()> {
        if matches!(self.state, SessionState::Recording | SessionState::Playing) {
            return Err(SessionError::InvalidTransition {
                action: "load a session",
                state: self.state,
            });
        }

        let stored = self.store.read(id)?;
        let (samples, format) =
            wav::decode(&stored.audio).map_err(|e| SessionError::corrupt(id, e))?;
        let document =
            EventDocument::from_json(&stored.events).map_err(|e| SessionError::corrupt(id, e))?;

        if document.session_id != id {
            warn!(
                "Event document for {} names session {}",
                id, document.session_id
            );
        }

        let session = Session::restored(id, samples, document.into_timeline());
        info!(
            "Loaded session {}: {:.2}s at {}Hz/{}ch, {} events",
            id,
            session.samples().duration_secs(),
            format.sample_rate,
            format.channels,
            session.timeline().len()
        );

        self.session = Some(session);
        self.cursor = None;
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Delete a stored session; the in-memory session is left alone
    pub fn delete_recording(&mut self, id: &str) -> SessionResult<()> {
        self.store.delete(id)
    }

    pub fn list_recordings(&self) -> SessionResult<Vec<String>> {
        self.store.list()
    }

    /// Start audio playback and timeline replay of the current session
    pub fn play_recording(&mut self) -> SessionResult<()> {
        match self.state {
            SessionState::Playing => {
                warn!("Playback already running");
                return Ok(());
            }
            SessionState::Recording => {
                return Err(SessionError::InvalidTransition {
                    action: "play",
                    state: self.state,
                })
            }
            SessionState::Idle | SessionState::Stopped => {}
        }

        let Some(session) = &self.session else {
            warn!("Nothing to play: no session recorded or loaded");
            return Ok(());
        };

        self.output.play(session.samples());
        self.cursor = Some(PlaybackCursor::new(session.timeline()));
        self.state = SessionState::Playing;

        info!(
            "Playing session {} ({:.2}s, {} events)",
            session.id(),
            session.playback_secs(),
            session.timeline().len()
        );
        Ok(())
    }

    pub fn stop_playback(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Playing {
            warn!("Playback not active");
            return Ok(());
        }

        self.finish_playback();
        info!("Stopped playback");
        Ok(())
    }

    pub fn toggle_recording(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Recording {
            self.stop_recording()
        } else {
            self.start_recording().map(|_| ())
        }
    }

    pub fn toggle_playback(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Playing {
            self.stop_playback()
        } else {
            self.play_recording()
        }
    }

    /// Flip whether capture contributes to recordings; returns the new setting
    pub fn toggle_microphone(&mut self) -> bool {
        self.record_microphone = !self.record_microphone;
        info!(
            "Microphone recording {}",
            if self.record_microphone { "enabled" } else { "disabled" }
        );

        if self.record_microphone
            && self.state == SessionState::Recording
            && self.mixer.armed_device().is_none()
        {
            self.arm_microphone();
        }
        self.record_microphone
    }

    /// Select the next listed capture device, re-arming if capturing
    pub fn cycle_microphone(&mut self) -> SessionResult<String> {
        let devices = self.capture.list_devices();
        if devices.is_empty() {
            return Err(SessionError::DeviceUnavailable);
        }

        let current = self
            .selected_device
            .as_ref()
            .and_then(|name| devices.iter().position(|d| d == name));
        let next = match current {
            Some(index) => (index + 1) % devices.len(),
            None => 0,
        };
        let name = devices[next].clone();
        self.selected_device = Some(name.clone());

        if self.mixer.armed_device().is_some() {
            self.disarm_microphone();
            self.arm_microphone();
        }

        info!("Selected microphone: {}", name);
        Ok(name)
    }

    /// Stamp an event with the session clock and append it
    ///
    /// Returns `None` (and records nothing) unless recording.
    pub fn record(&mut self, kind: EventKind, payload: EventPayload) -> Option<TimelineEvent> {
        if self.state != SessionState::Recording {
            return None;
        }

        let session = self.session.as_mut()?;
        let now = session.elapsed().as_secs_f64();
        let (_, timeline) = session.parts_mut();
        let event = timeline.record(kind, payload, now).clone();

        debug!(
            "Recorded {:?} {} at {:.3}s",
            event.kind, event.payload.identifier, event.timestamp
        );
        Some(event)
    }

    /// Advance the scheduler by `delta`
    ///
    /// While recording, captures and mixes one window and stops (saving) once
    /// the maximum duration is reached. While playing, fires every event due.
    pub fn tick(&mut self, delta: Duration) -> SessionResult<TickReport> {
        match self.state {
            SessionState::Recording => self.tick_recording(delta),
            SessionState::Playing => Ok(self.tick_playback(delta)),
            SessionState::Idle | SessionState::Stopped => Ok(TickReport::idle(self.state)),
        }
    }

    fn tick_recording(&mut self, delta: Duration) -> SessionResult<TickReport> {
        let Some(session) = self.session.as_mut() else {
            return Ok(TickReport::idle(self.state));
        };

        let elapsed = session.advance_clock(delta).as_secs_f64();
        let (samples, _) = session.parts_mut();
        let mix = self.mixer.tick(
            self.capture.as_mut(),
            self.output.as_mut(),
            self.record_microphone,
            elapsed,
            samples,
        );

        let mut report = TickReport {
            mix: Some(mix),
            ..TickReport::idle(self.state)
        };

        if mix.saturated {
            info!(
                "Reached maximum recording time ({:.1}s)",
                self.config.max_recording_secs
            );
            report.reached_max_duration = true;
            let saved = self.stop_recording();
            report.state = self.state;
            saved?;
        }

        Ok(report)
    }

    fn tick_playback(&mut self, delta: Duration) -> TickReport {
        let (Some(cursor), Some(session)) = (self.cursor.as_mut(), self.session.as_ref()) else {
            return TickReport::idle(self.state);
        };

        let dispatched = cursor.advance(delta.as_secs_f64(), self.trigger.as_mut());
        let finished = cursor.is_exhausted() && cursor.clock() >= session.playback_secs();

        if finished {
            self.finish_playback();
            info!("Playback finished");
        }

        TickReport {
            dispatched,
            playback_finished: finished,
            ..TickReport::idle(self.state)
        }
    }

    fn finish_playback(&mut self) {
        self.output.stop();
        self.cursor = None;
        self.state = SessionState::Stopped;
    }

    fn choose_device(&self) -> Option<String> {
        let devices = self.capture.list_devices();
        self.selected_device
            .as_ref()
            .filter(|name| devices.contains(name))
            .cloned()
            .or_else(|| devices.into_iter().next())
    }

    fn arm_microphone(&mut self) {
        let Some(device) = self.choose_device() else {
            warn!("{}; recording without microphone", SessionError::DeviceUnavailable);
            return;
        };

        match self
            .capture
            .begin(&device, self.config.mic_buffer_secs, self.config.sample_rate)
        {
            Ok(()) => {
                info!("Started recording from microphone: {}", device);
                self.selected_device = Some(device.clone());
                self.mixer.arm(Some(device));
            }
            Err(e) => {
                warn!(
                    "Failed to start microphone {}: {}; recording without microphone",
                    device, e
                );
            }
        }
    }

    fn disarm_microphone(&mut self) {
        if let Some(device) = self.mixer.disarm() {
            self.capture.end(&device);
            info!("Stopped microphone recording");
        }
    }
}
