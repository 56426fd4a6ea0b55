use serde::{Deserialize, Serialize};

use crate::audio::{AudioFormat, MixerConfig};

/// Configuration for the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sample rate of recordings in Hz
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Samples pulled from each source per tick
    pub window_size: usize,

    /// Recording stops and saves automatically at this length
    pub max_recording_secs: f64,

    /// Whether the capture device contributes to recordings
    pub record_microphone: bool,

    /// Length of the capture device's looping buffer
    pub mic_buffer_secs: u32,

    /// Capture device to use when present (defaults to the first listed)
    pub preferred_device: Option<String>,
}

impl SessionConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate.max(1), self.channels.max(1))
    }

    pub fn mixer_config(&self) -> MixerConfig {
        MixerConfig {
            format: self.format(),
            window_size: self.window_size,
            max_duration_secs: self.max_recording_secs,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            window_size: 1024,
            max_recording_secs: 300.0,
            record_microphone: true,
            mic_buffer_secs: 5,
            preferred_device: None,
        }
    }
}
