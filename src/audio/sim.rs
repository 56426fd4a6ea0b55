// Synthetic collaborators for running without audio hardware
//
// - ToneCaptureDevice: a capture device whose write head advances in real
//   time and whose samples are a sine tone
// - OutputBus: an output that "plays" buffers against a wall clock and
//   reports the window currently being played
// - LogTrigger: logs every fired timeline event

use std::f32::consts::TAU;
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::info;

use super::buffer::{AudioFormat, SampleBuffer};
use super::device::{AudioOutput, CaptureDevice, SoundTrigger};
use crate::timeline::TimelineEvent;

struct ToneRun {
    started: Instant,
    sample_rate: u32,
}

/// Capture device producing a continuous sine tone
pub struct ToneCaptureDevice {
    name: String,
    frequency_hz: f32,
    amplitude: f32,
    run: Option<ToneRun>,
}

impl ToneCaptureDevice {
    pub fn new(name: impl Into<String>, frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            name: name.into(),
            frequency_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
            run: None,
        }
    }

    fn sample_at(&self, index: u64, sample_rate: u32) -> f32 {
        let t = index as f64 / sample_rate as f64;
        let phase = (t * self.frequency_hz as f64).fract() as f32;
        (phase * TAU).sin() * self.amplitude
    }
}

impl CaptureDevice for ToneCaptureDevice {
    fn list_devices(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn begin(&mut self, device: &str, looping_buffer_secs: u32, sample_rate: u32) -> Result<()> {
        if device != self.name {
            bail!("Unknown capture device: {}", device);
        }
        if sample_rate == 0 {
            bail!("Sample rate must be positive");
        }

        info!(
            "Tone capture started on {} ({}Hz, {}s looping buffer)",
            device, sample_rate, looping_buffer_secs
        );
        self.run = Some(ToneRun {
            started: Instant::now(),
            sample_rate,
        });
        Ok(())
    }

    fn end(&mut self, device: &str) {
        if device == self.name && self.run.take().is_some() {
            info!("Tone capture stopped on {}", device);
        }
    }

    fn current_write_position(&self, device: &str) -> Option<u64> {
        let run = self.run.as_ref().filter(|_| device == self.name)?;
        Some((run.started.elapsed().as_secs_f64() * run.sample_rate as f64) as u64)
    }

    fn latest_window(&self, device: &str, window_size: usize) -> SampleBuffer {
        let Some(run) = self.run.as_ref().filter(|_| device == self.name) else {
            return SampleBuffer::silence(AudioFormat::default(), window_size);
        };
        let format = AudioFormat::mono(run.sample_rate);
        let end = self.current_write_position(device).unwrap_or(0);
        let start = end.saturating_sub(window_size as u64);

        // Positions before the first written sample stay silent
        let pad = window_size - (end - start) as usize;
        let mut samples = vec![0.0; pad];
        samples.extend((start..end).map(|index| self.sample_at(index, run.sample_rate)));
        SampleBuffer::from_samples(format, samples)
    }
}

struct Playback {
    buffer: SampleBuffer,
    started: Instant,
}

/// Output bus without a physical device
pub struct OutputBus {
    format: AudioFormat,
    playback: Option<Playback>,
}

impl OutputBus {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            playback: None,
        }
    }
}

impl AudioOutput for OutputBus {
    fn latest_output_window(&mut self, window_size: usize) -> SampleBuffer {
        let Some(playback) = &self.playback else {
            return SampleBuffer::silence(self.format, window_size);
        };

        let buffer = &playback.buffer;
        let frames_played = (playback.started.elapsed().as_secs_f64()
            * buffer.sample_rate() as f64) as usize;
        let end = (frames_played * buffer.channels() as usize).min(buffer.len());
        let start = end.saturating_sub(window_size);

        let mut samples = vec![0.0; window_size - (end - start)];
        samples.extend_from_slice(&buffer.samples()[start..end]);
        SampleBuffer::from_samples(buffer.format(), samples)
    }

    fn play(&mut self, buffer: &SampleBuffer) {
        info!(
            "Output bus playing {:.2}s of audio",
            buffer.duration_secs()
        );
        self.playback = Some(Playback {
            buffer: buffer.clone(),
            started: Instant::now(),
        });
    }

    fn stop(&mut self) {
        if self.playback.take().is_some() {
            info!("Output bus stopped");
        }
    }

    fn name(&self) -> &str {
        "output-bus"
    }
}

/// Sound trigger that logs events instead of playing samples
#[derive(Debug, Default)]
pub struct LogTrigger;

impl SoundTrigger for LogTrigger {
    fn fire(&mut self, event: &TimelineEvent) {
        info!(
            kind = ?event.kind,
            identifier = %event.payload.identifier,
            intensity = event.payload.intensity,
            sample = event.payload.sample.as_deref().unwrap_or("-"),
            "Fired event at {:.3}s",
            event.timestamp
        );
    }
}
