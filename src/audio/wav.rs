// PCM container codec
//
// Fixed 44-byte RIFF/WAVE layout: one "fmt " subchunk (PCM, 16 bytes)
// followed directly by the "data" subchunk. No extension chunks are
// written or accepted.

use super::buffer::{AudioFormat, SampleBuffer, BITS_PER_SAMPLE};
use crate::error::CodecError;

/// Size of the container header preceding sample data
pub const HEADER_SIZE: usize = 44;

const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;
const SCALE: f32 = 32767.0;

/// Quantize a float sample to 16-bit PCM, saturating outside [-1, 1]
pub fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * SCALE).round() as i16
}

pub fn dequantize(sample: i16) -> f32 {
    (sample as f32 / SCALE).max(-1.0)
}

/// Encode samples into a complete container
pub fn encode(buffer: &SampleBuffer, format: &AudioFormat) -> Result<Vec<u8>, CodecError> {
    let layout = validate_format(format)?;
    if buffer.channels() != format.channels {
        return Err(CodecError::UnsupportedFormat(format!(
            "buffer has {} channels, format declares {}",
            buffer.channels(),
            format.channels
        )));
    }

    let data_len = buffer.len() * 2;
    let data_size = u32::try_from(data_len)
        .ok()
        .filter(|size| size.checked_add(HEADER_SIZE as u32 - 8).is_some())
        .ok_or_else(|| {
            CodecError::UnsupportedFormat(format!("{} bytes of sample data is too large", data_len))
        })?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + data_len);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(data_size + HEADER_SIZE as u32 - 8).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    bytes.extend_from_slice(&format.channels.to_le_bytes());
    bytes.extend_from_slice(&format.sample_rate.to_le_bytes());
    bytes.extend_from_slice(&layout.byte_rate.to_le_bytes());
    bytes.extend_from_slice(&layout.block_align.to_le_bytes());
    bytes.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());

    for &sample in buffer.samples() {
        bytes.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    Ok(bytes)
}

/// Decode a container produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<(SampleBuffer, AudioFormat), CodecError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::MalformedContainer(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let header = Header(bytes);
    header.expect_tag(0, b"RIFF")?;
    header.expect_tag(8, b"WAVE")?;
    header.expect_tag(12, b"fmt ")?;

    let riff_size = header.u32_at(4) as usize;
    if riff_size != bytes.len() - 8 {
        return Err(CodecError::MalformedContainer(format!(
            "RIFF chunk declares {} bytes but {} follow it",
            riff_size,
            bytes.len() - 8
        )));
    }

    let fmt_size = header.u32_at(16);
    if fmt_size != FMT_CHUNK_SIZE {
        return Err(CodecError::MalformedContainer(format!(
            "format subchunk is {} bytes, expected {}",
            fmt_size, FMT_CHUNK_SIZE
        )));
    }

    let format_tag = header.u16_at(20);
    if format_tag != PCM_FORMAT_TAG {
        return Err(CodecError::UnsupportedFormat(format!(
            "format tag {} is not PCM",
            format_tag
        )));
    }

    let format = AudioFormat {
        channels: header.u16_at(22),
        sample_rate: header.u32_at(24),
        bits_per_sample: header.u16_at(34),
    };
    let layout = validate_format(&format)?;

    if header.u16_at(32) != layout.block_align || header.u32_at(28) != layout.byte_rate {
        return Err(CodecError::MalformedContainer(
            "block align or byte rate disagrees with channels and sample rate".to_string(),
        ));
    }

    header.expect_tag(36, b"data")?;
    let data_size = header.u32_at(40) as usize;
    let data = &bytes[HEADER_SIZE..];
    if data_size > data.len() {
        return Err(CodecError::MalformedContainer(format!(
            "data subchunk declares {} bytes but only {} follow the header",
            data_size,
            data.len()
        )));
    }
    if data_size % layout.block_align as usize != 0 {
        return Err(CodecError::MalformedContainer(format!(
            "data size {} is not a whole number of frames",
            data_size
        )));
    }

    let samples = data[..data_size]
        .chunks_exact(2)
        .map(|pair| dequantize(i16::from_le_bytes([pair[0], pair[1]])))
        .collect();

    Ok((SampleBuffer::from_samples(format, samples), format))
}

/// Per-frame and per-second byte counts of a validated format
struct Layout {
    block_align: u16,
    byte_rate: u32,
}

fn validate_format(format: &AudioFormat) -> Result<Layout, CodecError> {
    if format.bits_per_sample != BITS_PER_SAMPLE {
        return Err(CodecError::UnsupportedFormat(format!(
            "{} bits per sample (only {} is supported)",
            format.bits_per_sample, BITS_PER_SAMPLE
        )));
    }
    if format.channels == 0 {
        return Err(CodecError::UnsupportedFormat("zero channels".to_string()));
    }
    if format.sample_rate == 0 {
        return Err(CodecError::UnsupportedFormat("zero sample rate".to_string()));
    }

    let block_align = format.block_align().ok_or_else(|| {
        CodecError::UnsupportedFormat(format!(
            "{} channels overflow the frame size",
            format.channels
        ))
    })?;
    let byte_rate = format.byte_rate().ok_or_else(|| {
        CodecError::UnsupportedFormat(format!(
            "{}Hz with {} channels overflows the byte rate",
            format.sample_rate, format.channels
        ))
    })?;

    Ok(Layout {
        block_align,
        byte_rate,
    })
}

struct Header<'a>(&'a [u8]);

impl Header<'_> {
    fn expect_tag(&self, offset: usize, tag: &[u8; 4]) -> Result<(), CodecError> {
        let found = &self.0[offset..offset + 4];
        if found != tag {
            return Err(CodecError::MalformedContainer(format!(
                "expected {:?} at offset {}, found {:?}",
                String::from_utf8_lossy(tag),
                offset,
                String::from_utf8_lossy(found)
            )));
        }
        Ok(())
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.0[offset], self.0[offset + 1]])
    }

    fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.0[offset],
            self.0[offset + 1],
            self.0[offset + 2],
            self.0[offset + 3],
        ])
    }
}
