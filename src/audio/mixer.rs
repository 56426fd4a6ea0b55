// Per-tick capture pipeline
//
// Each tick pulls the latest window from the capture device and the latest
// window from the output bus, sums them sample-for-sample and appends the
// result to the session's accumulating buffer. Summing does not clip: values
// outside [-1, 1] survive until the container codec quantizes them.

use tracing::{debug, info};

use super::buffer::{AudioFormat, SampleBuffer};
use super::device::{AudioOutput, CaptureDevice};

/// Configuration for the capture mixer
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Format of the accumulated recording
    pub format: AudioFormat,
    /// Samples pulled from each source per tick
    pub window_size: usize,
    /// Recording length at which the mixer reports saturation
    pub max_duration_secs: f64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            window_size: 1024,
            max_duration_secs: 300.0,
        }
    }
}

/// What one mixer tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixReport {
    /// Samples appended to the accumulator
    pub appended: usize,
    /// Whether the capture device contributed fresh samples
    pub captured: bool,
    /// Recording has reached the configured maximum duration
    pub saturated: bool,
}

/// Combines capture and output windows into a recording accumulator
pub struct CaptureMixer {
    config: MixerConfig,
    /// Armed capture device name
    device: Option<String>,
    /// Write head observed on the previous tick
    last_write_position: Option<u64>,
}

impl CaptureMixer {
    pub fn new(config: MixerConfig) -> Self {
        info!(
            "Capture mixer initialized: {}Hz, {} channels, {} samples per tick",
            config.format.sample_rate, config.format.channels, config.window_size
        );

        Self {
            config,
            device: None,
            last_write_position: None,
        }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Start reading from `device` on subsequent ticks
    pub fn arm(&mut self, device: Option<String>) {
        self.device = device;
        self.last_write_position = None;
    }

    pub fn disarm(&mut self) -> Option<String> {
        self.last_write_position = None;
        self.device.take()
    }

    pub fn armed_device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Run one tick of the pipeline
    ///
    /// `include_capture` gates the microphone contribution without disarming
    /// the device. `elapsed_secs` is the session clock after this tick.
    pub fn tick(
        &mut self,
        capture: &mut dyn CaptureDevice,
        output: &mut dyn AudioOutput,
        include_capture: bool,
        elapsed_secs: f64,
        accumulator: &mut SampleBuffer,
    ) -> MixReport {
        let window_size = self.config.window_size;

        let captured = if include_capture {
            self.poll_capture(capture)
        } else {
            None
        };
        let output_window = output.latest_output_window(window_size);

        let mut mixed = vec![0.0f32; window_size];
        for (slot, sample) in mixed.iter_mut().zip(output_window.samples()) {
            *slot += sample;
        }
        if let Some(window) = &captured {
            for (slot, sample) in mixed.iter_mut().zip(window.samples()) {
                *slot += sample;
            }
        }

        let before = accumulator.len();
        accumulator.extend_from_slice(&mixed);

        MixReport {
            appended: accumulator.len() - before,
            captured: captured.is_some(),
            saturated: elapsed_secs >= self.config.max_duration_secs,
        }
    }

    /// Latest capture window, or `None` when the write head has not advanced
    fn poll_capture(&mut self, capture: &dyn CaptureDevice) -> Option<SampleBuffer> {
        let device = self.device.as_deref()?;
        let position = capture.current_write_position(device)?;

        let advanced = match self.last_write_position {
            Some(last) => position > last,
            None => position > 0,
        };
        self.last_write_position = Some(position);

        if !advanced {
            debug!(device, position, "Capture write head did not advance, using silence");
            return None;
        }

        Some(capture.latest_window(device, self.config.window_size))
    }
}
