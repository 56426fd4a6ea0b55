// Integration tests for the session lifecycle
//
// These tests drive a SessionController with mock devices and a real
// on-disk session store: record, save, reload and replay.

use anyhow::Result;
use session_recorder::audio::mock::{MockCaptureDevice, MockOutput, MockTrigger};
use session_recorder::audio::wav;
use session_recorder::{
    AudioFormat, EventDocument, EventKind, EventPayload, EventTimeline, FsSessionStore,
    SampleBuffer, SessionConfig, SessionController, SessionError, SessionResult, SessionState,
    SessionStore, StoredSession, TimelineEvent,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn config() -> SessionConfig {
    SessionConfig {
        sample_rate: 8000,
        window_size: 80,
        max_recording_secs: 10.0,
        ..SessionConfig::default()
    }
}

fn controller_with(
    config: SessionConfig,
    store: impl SessionStore + 'static,
) -> (SessionController, MockCaptureDevice, MockOutput, MockTrigger) {
    let capture = MockCaptureDevice::with_devices(&["mic"]);
    let output = MockOutput::new();
    let trigger = MockTrigger::new();
    let controller = SessionController::new(
        config,
        Box::new(capture.clone()),
        Box::new(output.clone()),
        Box::new(trigger.clone()),
        Box::new(store),
    );
    (controller, capture, output, trigger)
}

#[test]
fn test_record_save_and_reload() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let (mut controller, capture, output, _) = controller_with(config(), store.clone());

    output.set_output_window(&[0.25; 80]);
    let id = controller.start_recording()?;

    for tick in 0..10 {
        capture.feed("mic", &[0.5; 80]);
        controller.tick(Duration::from_millis(10))?;
        if tick % 3 == 0 {
            controller.record(EventKind::DrumHit, EventPayload::new("snare", 0.7));
        }
    }
    controller.stop_recording()?;

    assert!(store.audio_path(&id).exists());
    assert!(store.events_path(&id).exists());
    assert_eq!(store.list()?, vec![id.clone()]);

    let (mut reloaded, _, _, _) = controller_with(config(), store.clone());
    reloaded.load_recording(&id)?;
    let session = reloaded.session().expect("session loaded");

    assert_eq!(session.format(), AudioFormat::mono(8000));
    assert_eq!(session.samples().len(), 800);
    assert!(session
        .samples()
        .samples()
        .iter()
        .all(|s| (s - 0.75).abs() <= 1.0 / 32767.0));

    let stamps: Vec<f64> = session.timeline().events().iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps.len(), 4);
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

    Ok(())
}

#[test]
fn test_mixed_samples_clip_only_at_encode() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let (mut controller, capture, output, _) = controller_with(config(), store.clone());

    output.set_output_window(&[0.8; 80]);
    let id = controller.start_recording()?;
    capture.feed("mic", &[0.8; 80]);
    controller.tick(Duration::from_millis(10))?;

    let in_memory = controller.session().expect("recording").samples().samples().to_vec();
    assert!(in_memory.iter().all(|s| (s - 1.6).abs() < 1e-6));

    controller.stop_recording()?;
    let (decoded, _) = wav::decode(&store.read(&id)?.audio)?;
    assert!(decoded.samples().iter().all(|&s| s == 1.0));

    Ok(())
}

#[test]
fn test_playback_fires_events_in_timestamp_order() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());

    // Stored out of order; ties must keep their stored relative order
    let events = vec![
        TimelineEvent::new(EventKind::DrumHit, 3.0, EventPayload::new("crash", 1.0)),
        TimelineEvent::new(EventKind::DrumHit, 1.2, EventPayload::new("snare", 0.6)),
        TimelineEvent::new(EventKind::DrumHit, 0.5, EventPayload::new("kick", 0.9)),
        TimelineEvent::new(EventKind::DrumHit, 1.2, EventPayload::new("hat", 0.4)),
    ];
    let document = EventDocument {
        session_id: "Session_fixture".to_string(),
        events,
    };
    let format = AudioFormat::mono(8000);
    let audio = wav::encode(&SampleBuffer::silence(format, 8000), &format)?;
    store.write("Session_fixture", &audio, &document.to_json()?)?;

    let (mut controller, _, output, trigger) = controller_with(config(), store);
    controller.load_recording("Session_fixture")?;
    controller.play_recording()?;
    assert_eq!(output.played().map(|b| b.len()), Some(8000));

    let mut per_tick = Vec::new();
    while controller.state() == SessionState::Playing {
        per_tick.push(controller.tick(Duration::from_millis(250))?.dispatched);
    }

    // Clock: 0.25, 0.5, 0.75, 1.0, 1.25, ... 3.0
    assert_eq!(per_tick, vec![0, 1, 0, 0, 2, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(trigger.fired_ids(), vec!["kick", "snare", "hat", "crash"]);
    assert_eq!(controller.state(), SessionState::Stopped);

    Ok(())
}

#[test]
fn test_stop_playback_cancels_dispatch() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let (mut controller, _, _, trigger) = controller_with(config(), store);

    controller.start_recording()?;
    controller.tick(Duration::from_secs(1))?;
    controller.record(EventKind::DrumHit, EventPayload::new("late", 1.0));
    controller.stop_recording()?;

    controller.play_recording()?;
    controller.tick(Duration::from_millis(500))?;
    controller.stop_playback()?;
    let report = controller.tick(Duration::from_secs(5))?;

    assert_eq!(report.dispatched, 0);
    assert!(trigger.fired().is_empty());

    // Playing again starts from the beginning
    controller.play_recording()?;
    controller.tick(Duration::from_secs(1))?;
    assert_eq!(trigger.fired_ids(), vec!["late"]);

    Ok(())
}

#[test]
fn test_empty_session_saves_header_only() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let (mut controller, _, _, _) = controller_with(config(), store.clone());

    let id = controller.start_recording()?;
    controller.stop_recording()?;

    let stored = store.read(&id)?;
    assert_eq!(stored.audio.len(), wav::HEADER_SIZE);
    let document = EventDocument::from_json(&stored.events)?;
    assert!(document.events.is_empty());
    assert_eq!(document.session_id, id);

    Ok(())
}

#[test]
fn test_max_duration_triggers_one_save() -> Result<()> {
    let dir = TempDir::new()?;
    let store = CountingStore::new(FsSessionStore::new(dir.path()));
    let writes = store.writes.clone();
    let config = SessionConfig {
        max_recording_secs: 2.0,
        ..config()
    };
    let (mut controller, _, _, _) = controller_with(config, store);

    controller.start_recording()?;
    let mut auto_stops = 0;
    for _ in 0..50 {
        if controller.tick(Duration::from_millis(60))?.reached_max_duration {
            auto_stops += 1;
        }
    }

    assert_eq!(auto_stops, 1);
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), SessionState::Stopped);

    Ok(())
}

#[test]
fn test_failed_save_keeps_session_for_retry() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FlakyStore::new(FsSessionStore::new(dir.path()));
    let failing = store.failing.clone();
    let (mut controller, _, _, _) = controller_with(config(), store.clone());

    let id = controller.start_recording()?;
    controller.tick(Duration::from_millis(10))?;
    controller.record(EventKind::Toggle, EventPayload::new("mic", 1.0));

    failing.store(true, Ordering::SeqCst);
    let err = controller.stop_recording().unwrap_err();
    assert!(matches!(err, SessionError::StorageWriteFailure { .. }));
    assert_eq!(controller.state(), SessionState::Stopped);
    assert_eq!(controller.session().expect("kept").timeline().len(), 1);

    failing.store(false, Ordering::SeqCst);
    controller.save()?;
    assert_eq!(store.list()?, vec![id]);

    Ok(())
}

#[test]
fn test_corrupt_event_document() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let format = AudioFormat::mono(8000);
    let audio = wav::encode(&SampleBuffer::new(format), &format)?;
    store.write("Session_bad", &audio, b"{\"events\": 12}")?;

    let (mut controller, _, _, _) = controller_with(config(), store);
    let err = controller.load_recording("Session_bad").unwrap_err();

    assert!(matches!(err, SessionError::CorruptSession { .. }));
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.session().is_none());

    Ok(())
}

fn store_document(store: &FsSessionStore, id: &str, events: &str) -> Result<()> {
    let format = AudioFormat::mono(8000);
    let audio = wav::encode(&SampleBuffer::silence(format, 800), &format)?;
    let document = format!(r#"{{"session_id": "{}", "events": {}}}"#, id, events);
    store.write(id, &audio, document.as_bytes())?;
    Ok(())
}

#[test]
fn test_loaded_intensity_is_clamped_before_dispatch() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    store_document(
        &store,
        "Session_loud",
        r#"[{"kind": "drum_hit", "timestamp": 0.05, "identifier": "kick", "intensity": 5.0}]"#,
    )?;

    let (mut controller, _, _, trigger) = controller_with(config(), store);
    controller.load_recording("Session_loud")?;
    controller.play_recording()?;
    controller.tick(Duration::from_millis(100))?;

    let fired = trigger.fired();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].payload.intensity, 1.0);

    Ok(())
}

#[test]
fn test_negative_timestamp_is_corrupt() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    store_document(
        &store,
        "Session_early",
        r#"[{"kind": "drum_hit", "timestamp": -3.0, "identifier": "kick", "intensity": 0.5}]"#,
    )?;

    let (mut controller, _, _, _) = controller_with(config(), store);
    let err = controller.load_recording("Session_early").unwrap_err();

    assert!(matches!(err, SessionError::CorruptSession { .. }));
    assert!(controller.session().is_none());

    Ok(())
}

#[test]
fn test_overflowing_container_header_is_corrupt() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let format = AudioFormat::mono(8000);
    let mut audio = wav::encode(&SampleBuffer::silence(format, 80), &format)?;
    audio[22..24].copy_from_slice(&32768u16.to_le_bytes());
    audio[28..32].copy_from_slice(&0u32.to_le_bytes());
    audio[32..34].copy_from_slice(&0u16.to_le_bytes());
    store.write("Session_wide", &audio, br#"{"session_id": "Session_wide"}"#)?;

    let (mut controller, _, _, _) = controller_with(config(), store);
    let err = controller.load_recording("Session_wide").unwrap_err();

    assert!(matches!(err, SessionError::CorruptSession { .. }));
    assert_eq!(controller.state(), SessionState::Idle);

    Ok(())
}

#[test]
fn test_delete_then_load_is_not_found() -> Result<()> {
    let dir = TempDir::new()?;
    let store = FsSessionStore::new(dir.path());
    let (mut controller, _, _, _) = controller_with(config(), store);

    let id = controller.start_recording()?;
    controller.stop_recording()?;
    controller.delete_recording(&id)?;
    controller.delete_recording(&id)?;

    assert!(controller.list_recordings()?.is_empty());
    assert!(matches!(
        controller.load_recording(&id),
        Err(SessionError::SessionNotFound(_))
    ));

    Ok(())
}

#[test]
fn test_timeline_recording_is_monotonic_across_ticks() {
    let dir = TempDir::new().unwrap();
    let (mut controller, _, _, _) = controller_with(config(), FsSessionStore::new(dir.path()));
    controller.start_recording().unwrap();

    for step in [0u64, 5, 0, 17, 3, 0, 40] {
        controller.tick(Duration::from_millis(step)).unwrap();
        controller.record(EventKind::DrumHit, EventPayload::new("tom", 0.5));
        controller.record(EventKind::DrumHit, EventPayload::new("tom", 0.5));
    }

    let timeline: &EventTimeline = controller.session().unwrap().timeline();
    assert_eq!(timeline.len(), 14);
    assert!(timeline
        .events()
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

/// Store wrapper that fails writes while `failing` is set
#[derive(Clone)]
struct FlakyStore {
    inner: FsSessionStore,
    failing: Arc<AtomicBool>,
}

impl FlakyStore {
    fn new(inner: FsSessionStore) -> Self {
        Self {
            inner,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SessionStore for FlakyStore {
    fn write(&self, id: &str, audio: &[u8], events: &[u8]) -> SessionResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::StorageWriteFailure {
                id: id.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.write(id, audio, events)
    }

    fn read(&self, id: &str) -> SessionResult<StoredSession> {
        self.inner.read(id)
    }

    fn list(&self) -> SessionResult<Vec<String>> {
        self.inner.list()
    }

    fn delete(&self, id: &str) -> SessionResult<()> {
        self.inner.delete(id)
    }
}

/// Store wrapper that counts writes
struct CountingStore {
    inner: FsSessionStore,
    writes: Arc<AtomicUsize>,
}

impl CountingStore {
    fn new(inner: FsSessionStore) -> Self {
        Self {
            inner,
            writes: Arc::default(),
        }
    }
}

impl SessionStore for CountingStore {
    fn write(&self, id: &str, audio: &[u8], events: &[u8]) -> SessionResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(id, audio, events)
    }

    fn read(&self, id: &str) -> SessionResult<StoredSession> {
        self.inner.read(id)
    }

    fn list(&self) -> SessionResult<Vec<String>> {
        self.inner.list()
    }

    fn delete(&self, id: &str) -> SessionResult<()> {
        self.inner.delete(id)
    }
}
