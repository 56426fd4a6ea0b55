use anyhow::Result;

use super::buffer::SampleBuffer;
use crate::timeline::TimelineEvent;

/// Rolling capture device (microphone) collaborator
///
/// Implementations typically fill a looping buffer from a real-time thread.
/// The recorder only ever polls: none of these calls may block waiting for
/// new device data.
pub trait CaptureDevice: Send {
    /// Names of the capture devices currently present
    fn list_devices(&self) -> Vec<String>;

    /// Start filling a looping buffer of `looping_buffer_secs` seconds
    fn begin(&mut self, device: &str, looping_buffer_secs: u32, sample_rate: u32) -> Result<()>;

    /// Stop capturing on `device`
    fn end(&mut self, device: &str);

    /// Total samples written since `begin`, or `None` if the device is not running
    fn current_write_position(&self, device: &str) -> Option<u64>;

    /// The most recent `window_size` samples, silence-padded if fewer exist
    fn latest_window(&self, device: &str, window_size: usize) -> SampleBuffer;
}

/// Audio output (master bus) collaborator
pub trait AudioOutput: Send {
    /// The most recent `window_size` samples sent to the output
    fn latest_output_window(&mut self, window_size: usize) -> SampleBuffer;

    /// Start playing `buffer` from its beginning
    fn play(&mut self, buffer: &SampleBuffer);

    /// Stop any playback started by [`AudioOutput::play`]
    fn stop(&mut self);

    fn name(&self) -> &str;
}

/// Receives timeline events as playback reaches them
pub trait SoundTrigger: Send {
    fn fire(&mut self, event: &TimelineEvent);
}
