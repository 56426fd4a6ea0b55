// Mock collaborators with shared state
//
// Each mock is a cheap handle over `Arc<Mutex<..>>`, so a test can keep one
// clone for inspection while the controller owns another.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;

use super::buffer::{AudioFormat, SampleBuffer};
use super::device::{AudioOutput, CaptureDevice, SoundTrigger};
use crate::timeline::TimelineEvent;

#[derive(Default)]
struct MockDevice {
    samples: Vec<f32>,
    write_position: u64,
    running: bool,
    begin_count: usize,
    end_count: usize,
}

/// Capture device whose samples are fed explicitly by the test
#[derive(Clone, Default)]
pub struct MockCaptureDevice {
    devices: Arc<Mutex<HashMap<String, MockDevice>>>,
    order: Arc<Vec<String>>,
    sample_rate: Arc<Mutex<u32>>,
}

impl MockCaptureDevice {
    pub fn with_devices(names: &[&str]) -> Self {
        let devices = names
            .iter()
            .map(|name| (name.to_string(), MockDevice::default()))
            .collect();

        Self {
            devices: Arc::new(Mutex::new(devices)),
            order: Arc::new(names.iter().map(|name| name.to_string()).collect()),
            sample_rate: Arc::new(Mutex::new(44100)),
        }
    }

    /// Append captured samples and advance the write head
    pub fn feed(&self, device: &str, samples: &[f32]) {
        let mut devices = self.devices.lock();
        if let Some(state) = devices.get_mut(device) {
            state.samples.extend_from_slice(samples);
            state.write_position += samples.len() as u64;
        }
    }

    /// Force the reported write head, e.g. to simulate a device reset
    pub fn set_write_position(&self, device: &str, position: u64) {
        if let Some(state) = self.devices.lock().get_mut(device) {
            state.write_position = position;
        }
    }

    pub fn is_running(&self, device: &str) -> bool {
        self.devices
            .lock()
            .get(device)
            .map(|state| state.running)
            .unwrap_or(false)
    }

    pub fn begin_count(&self, device: &str) -> usize {
        self.devices
            .lock()
            .get(device)
            .map(|state| state.begin_count)
            .unwrap_or(0)
    }

    pub fn end_count(&self, device: &str) -> usize {
        self.devices
            .lock()
            .get(device)
            .map(|state| state.end_count)
            .unwrap_or(0)
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn list_devices(&self) -> Vec<String> {
        self.order.as_ref().clone()
    }

    fn begin(&mut self, device: &str, _looping_buffer_secs: u32, sample_rate: u32) -> Result<()> {
        let mut devices = self.devices.lock();
        let state = devices
            .get_mut(device)
            .ok_or_else(|| anyhow::anyhow!("Unknown capture device: {}", device))?;
        state.running = true;
        state.begin_count += 1;
        *self.sample_rate.lock() = sample_rate;
        Ok(())
    }

    fn end(&mut self, device: &str) {
        if let Some(state) = self.devices.lock().get_mut(device) {
            state.running = false;
            state.end_count += 1;
        }
    }

    fn current_write_position(&self, device: &str) -> Option<u64> {
        self.devices
            .lock()
            .get(device)
            .filter(|state| state.running)
            .map(|state| state.write_position)
    }

    fn latest_window(&self, device: &str, window_size: usize) -> SampleBuffer {
        let format = AudioFormat::mono(*self.sample_rate.lock());
        let devices = self.devices.lock();
        let Some(state) = devices.get(device) else {
            return SampleBuffer::silence(format, window_size);
        };

        let start = state.samples.len().saturating_sub(window_size);
        let mut window = state.samples[start..].to_vec();
        window.resize(window_size, 0.0);
        SampleBuffer::from_samples(format, window)
    }
}

#[derive(Default)]
struct OutputState {
    window: Vec<f32>,
    playing: Option<SampleBuffer>,
    play_count: usize,
    stop_count: usize,
}

/// Output bus returning a fixed window and recording play/stop calls
#[derive(Clone, Default)]
pub struct MockOutput {
    state: Arc<Mutex<OutputState>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window returned by every subsequent `latest_output_window`
    pub fn set_output_window(&self, samples: &[f32]) {
        self.state.lock().window = samples.to_vec();
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing.is_some()
    }

    pub fn played(&self) -> Option<SampleBuffer> {
        self.state.lock().playing.clone()
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stop_count
    }
}

impl AudioOutput for MockOutput {
    fn latest_output_window(&mut self, window_size: usize) -> SampleBuffer {
        let mut window = self.state.lock().window.clone();
        window.resize(window_size, 0.0);
        SampleBuffer::from_samples(AudioFormat::default(), window)
    }

    fn play(&mut self, buffer: &SampleBuffer) {
        let mut state = self.state.lock();
        state.playing = Some(buffer.clone());
        state.play_count += 1;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.playing = None;
        state.stop_count += 1;
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Sound trigger that remembers every fired event
#[derive(Clone, Default)]
pub struct MockTrigger {
    fired: Arc<Mutex<Vec<TimelineEvent>>>,
}

impl MockTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> Vec<TimelineEvent> {
        self.fired.lock().clone()
    }

    pub fn fired_ids(&self) -> Vec<String> {
        self.fired
            .lock()
            .iter()
            .map(|event| event.payload.identifier.clone())
            .collect()
    }
}

impl SoundTrigger for MockTrigger {
    fn fire(&mut self, event: &TimelineEvent) {
        self.fired.lock().push(event.clone());
    }
}
