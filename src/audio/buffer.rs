use serde::{Deserialize, Serialize};

/// PCM bit depth used for every container this system writes
pub const BITS_PER_SAMPLE: u16 = 16;

/// Audio format descriptor (16-bit PCM only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Bits per sample (always 16)
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    /// Bytes per frame (one sample for every channel), `None` on overflow
    pub fn block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second of audio, `None` on overflow
    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(u32::from(self.block_align()?))
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::mono(44100)
    }
}

/// Interleaved PCM float samples in [-1.0, 1.0]
///
/// Length is always a whole number of frames: appends that would leave a
/// partial frame are zero-padded to the next frame boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            samples: Vec::new(),
            channels: format.channels.max(1),
            sample_rate: format.sample_rate,
        }
    }

    /// A buffer of `len` zero samples (rounded up to whole frames)
    pub fn silence(format: AudioFormat, len: usize) -> Self {
        let mut buffer = Self::new(format);
        buffer.samples = vec![0.0; buffer.frame_aligned(len)];
        buffer
    }

    pub fn from_samples(format: AudioFormat, samples: Vec<f32>) -> Self {
        let mut buffer = Self::new(format);
        buffer.samples = samples;
        buffer.pad_to_frame();
        buffer
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    /// Append another buffer's samples
    pub fn extend_from(&mut self, other: &SampleBuffer) {
        self.extend_from_slice(other.samples());
    }

    pub fn extend_from_slice(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
        self.pad_to_frame();
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    fn frame_aligned(&self, len: usize) -> usize {
        let channels = self.channels as usize;
        len.div_ceil(channels) * channels
    }

    fn pad_to_frame(&mut self) {
        let aligned = self.frame_aligned(self.samples.len());
        self.samples.resize(aligned, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_derived_fields() {
        let format = AudioFormat::new(44100, 2);
        assert_eq!(format.block_align(), Some(4));
        assert_eq!(format.byte_rate(), Some(176_400));
        assert_eq!(format.bits_per_sample, 16);
    }

    #[test]
    fn test_derived_fields_overflow_to_none() {
        assert_eq!(AudioFormat::new(44100, 32768).block_align(), None);
        assert_eq!(AudioFormat::new(44100, 32768).byte_rate(), None);
        assert_eq!(AudioFormat::mono(u32::MAX).block_align(), Some(2));
        assert_eq!(AudioFormat::mono(u32::MAX).byte_rate(), None);
    }

    #[test]
    fn test_buffer_pads_partial_frames() {
        let format = AudioFormat::new(48000, 2);
        let buffer = SampleBuffer::from_samples(format, vec![0.1, 0.2, 0.3]);

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.samples()[3], 0.0);
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = SampleBuffer::silence(AudioFormat::mono(1000), 500);
        assert!((buffer.duration_secs() - 0.5).abs() < f64::EPSILON);
        assert!(buffer.is_silent());
    }

    #[test]
    fn test_extend_keeps_frame_alignment() {
        let format = AudioFormat::new(8000, 2);
        let mut buffer = SampleBuffer::new(format);
        buffer.extend_from_slice(&[0.5]);
        buffer.extend_from_slice(&[0.25, 0.25]);

        assert_eq!(buffer.samples(), &[0.5, 0.0, 0.25, 0.25]);
        assert_eq!(buffer.len() % buffer.channels() as usize, 0);
    }
}
