use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioFormat, SampleBuffer};
use crate::timeline::EventTimeline;

/// Lifecycle state of the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
    Playing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Stopped => "stopped",
            SessionState::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// One recording: its clock, audio accumulator and event timeline
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    format: AudioFormat,
    elapsed: Duration,
    samples: SampleBuffer,
    timeline: EventTimeline,
}

impl Session {
    /// A fresh, empty session for recording
    pub fn new(id: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            id: id.into(),
            format,
            elapsed: Duration::ZERO,
            samples: SampleBuffer::new(format),
            timeline: EventTimeline::new(),
        }
    }

    /// A session reconstructed from storage
    pub fn restored(id: impl Into<String>, samples: SampleBuffer, timeline: EventTimeline) -> Self {
        let end = samples.duration_secs().max(timeline.end_secs());
        let elapsed = Duration::try_from_secs_f64(end).unwrap_or(Duration::MAX);
        Self {
            id: id.into(),
            format: samples.format(),
            elapsed,
            samples,
            timeline,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Session clock: time since recording started
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn timeline(&self) -> &EventTimeline {
        &self.timeline
    }

    /// Length of playback: the audio or the last event, whichever is later
    pub fn playback_secs(&self) -> f64 {
        self.samples.duration_secs().max(self.timeline.end_secs())
    }

    pub(crate) fn advance_clock(&mut self, delta: Duration) -> Duration {
        self.elapsed = self.elapsed.saturating_add(delta);
        self.elapsed
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut SampleBuffer, &mut EventTimeline) {
        (&mut self.samples, &mut self.timeline)
    }
}

/// Issues timestamp-derived session ids that never repeat within a process
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    issued: HashSet<String>,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Session_YYYYMMDD_HHMMSS`, with `_N` appended on collision
    pub fn next<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let base = now.format("Session_%Y%m%d_%H%M%S").to_string();
        let mut id = base.clone();
        let mut suffix = 1;
        while self.issued.contains(&id) {
            suffix += 1;
            id = format!("{}_{}", base, suffix);
        }

        self.issued.insert(id.clone());
        id
    }

    pub fn next_now(&mut self) -> String {
        self.next(Local::now())
    }
}
