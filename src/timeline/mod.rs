//! Discrete event timeline
//!
//! This module provides:
//! - `TimelineEvent`: a timestamped performance event (drum hit, toggle)
//! - `EventTimeline`: the append-only list recorded alongside audio
//! - `EventDocument`: the JSON projection persisted next to the audio file
//! - `PlaybackCursor`: sample-accurate replay of a timeline against a clock

mod event;
mod playback;

use serde::{Deserialize, Serialize};

pub use event::{EventKind, EventPayload, TimelineEvent};
pub use playback::PlaybackCursor;

/// Ordered events of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTimeline {
    events: Vec<TimelineEvent>,
}

impl EventTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap events in their stored order (not necessarily sorted)
    pub fn from_events(events: Vec<TimelineEvent>) -> Self {
        Self { events }
    }

    /// Append an event stamped at `now` seconds since recording started
    ///
    /// The stamp never goes backwards: a `now` earlier than the last event is
    /// raised to the last event's timestamp.
    pub fn record(&mut self, kind: EventKind, payload: EventPayload, now: f64) -> &TimelineEvent {
        let floor = self.events.last().map(|e| e.timestamp).unwrap_or(0.0);
        let timestamp = if now.is_finite() { now.max(floor) } else { floor };

        self.events.push(TimelineEvent::new(kind, timestamp, payload));
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the latest event, in any order
    pub fn end_secs(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.timestamp)
            .fold(0.0, f64::max)
    }

    /// Copy of the events stably sorted by timestamp
    pub fn sorted(&self) -> Vec<TimelineEvent> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        events
    }
}

/// Persisted form of a session's timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDocument {
    pub session_id: String,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
}

impl EventDocument {
    pub fn new(session_id: impl Into<String>, timeline: &EventTimeline) -> Self {
        Self {
            session_id: session_id.into(),
            events: timeline.events().to_vec(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn into_timeline(self) -> EventTimeline {
        EventTimeline::from_events(self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_monotonic() {
        let mut timeline = EventTimeline::new();
        timeline.record(EventKind::DrumHit, EventPayload::new("kick", 1.0), 0.5);
        timeline.record(EventKind::DrumHit, EventPayload::new("snare", 1.0), 0.25);
        timeline.record(EventKind::Toggle, EventPayload::new("mic", 1.0), 0.75);

        let stamps: Vec<f64> = timeline.events().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![0.5, 0.5, 0.75]);
    }

    #[test]
    fn test_intensity_is_clamped() {
        assert_eq!(EventPayload::new("kick", 3.0).intensity, 1.0);
        assert_eq!(EventPayload::new("kick", -1.0).intensity, 0.0);
        assert_eq!(EventPayload::new("kick", f32::NAN).intensity, 0.0);
    }

    #[test]
    fn test_sorted_is_stable() {
        let timeline = EventTimeline::from_events(vec![
            TimelineEvent::new(EventKind::DrumHit, 1.2, EventPayload::new("b", 0.5)),
            TimelineEvent::new(EventKind::DrumHit, 0.5, EventPayload::new("a", 0.5)),
            TimelineEvent::new(EventKind::DrumHit, 1.2, EventPayload::new("c", 0.5)),
        ]);

        let ids: Vec<String> = timeline
            .sorted()
            .into_iter()
            .map(|e| e.payload.identifier)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(timeline.end_secs(), 1.2);
    }

    #[test]
    fn test_document_field_names() {
        let mut timeline = EventTimeline::new();
        timeline.record(
            EventKind::DrumHit,
            EventPayload::new("snare", 0.8).with_sample("snare_02.wav"),
            1.5,
        );

        let json: serde_json::Value =
            serde_json::from_slice(&EventDocument::new("Session_1", &timeline).to_json().unwrap())
                .unwrap();
        let event = &json["events"][0];

        assert_eq!(json["session_id"], "Session_1");
        assert_eq!(event["kind"], "drum_hit");
        assert_eq!(event["timestamp"], 1.5);
        assert_eq!(event["identifier"], "snare");
        assert_eq!(event["sample"], "snare_02.wav");
        assert!((event["intensity"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_document_without_sample_reference() {
        let json = br#"{"session_id":"s","events":[{"kind":"toggle","timestamp":0.0,"identifier":"mic","intensity":1.0}]}"#;
        let document = EventDocument::from_json(json).unwrap();

        assert_eq!(document.events.len(), 1);
        assert_eq!(document.events[0].kind, EventKind::Toggle);
        assert_eq!(document.events[0].payload.sample, None);
    }

    #[test]
    fn test_stored_intensity_is_clamped() {
        let json = br#"{
            "session_id": "Session_loud",
            "events": [
                {"kind": "drum_hit", "timestamp": 0.5, "identifier": "kick", "intensity": 5.0},
                {"kind": "drum_hit", "timestamp": 1.0, "identifier": "hat", "intensity": -2.0}
            ]
        }"#;
        let document = EventDocument::from_json(json).unwrap();

        assert_eq!(document.events[0].payload.intensity, 1.0);
        assert_eq!(document.events[1].payload.intensity, 0.0);
    }

    #[test]
    fn test_negative_stored_timestamp_is_rejected() {
        let json = br#"{
            "session_id": "Session_early",
            "events": [
                {"kind": "toggle", "timestamp": -3.0, "identifier": "mic", "intensity": 1.0}
            ]
        }"#;

        assert!(EventDocument::from_json(json).is_err());
    }

    #[test]
    fn test_empty_document() {
        let document = EventDocument::new("empty", &EventTimeline::new());
        let parsed = EventDocument::from_json(&document.to_json().unwrap()).unwrap();

        assert!(parsed.into_timeline().is_empty());
    }
}
