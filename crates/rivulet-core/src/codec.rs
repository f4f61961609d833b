//! Audio file codec boundary.
//!
//! WAV is decoded and encoded with `hound` when the `wav` feature is enabled.
//! Any other extension, or any file in a build without `wav`, fails with
//! [`Error::CodecUnavailable`](crate::Error::CodecUnavailable).

use std::path::Path;

use crate::buffer::Buffer;
use crate::{Error, Result};

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn unavailable(path: &Path) -> Error {
    Error::CodecUnavailable(path.display().to_string())
}

/// Returns `true` if this build can decode and encode `path`.
pub fn is_supported(path: &Path) -> bool {
    cfg!(feature = "wav") && extension(path) == "wav"
}

/// Decode an audio file into a [`Buffer`], one buffer channel per file channel.
///
/// Integer PCM is normalized to `[-1, 1)`.
pub fn decode(path: &Path) -> Result<Buffer> {
    if !is_supported(path) {
        return Err(unavailable(path));
    }
    wav::decode(path)
}

/// Encode `buffer` as a 32-bit float audio file.
pub fn encode(path: &Path, buffer: &Buffer) -> Result<()> {
    if !is_supported(path) {
        return Err(unavailable(path));
    }
    wav::encode(path, buffer)
}

#[cfg(feature = "wav")]
mod wav {
    use std::path::Path;

    use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

    use crate::Result;
    use crate::buffer::Buffer;

    pub(super) fn decode(path: &Path) -> Result<Buffer> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let num_frames = interleaved.len() / channels.max(1);
        let mut data = vec![Vec::with_capacity(num_frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (channel, &sample) in data.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Buffer::from_channels(data, spec.sample_rate as f32)
    }

    pub(super) fn encode(path: &Path, buffer: &Buffer) -> Result<()> {
        let spec = WavSpec {
            channels: buffer.num_channels() as u16,
            sample_rate: buffer.sample_rate() as u32,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for frame in 0..buffer.num_frames() {
            for channel in 0..buffer.num_channels() {
                writer.write_sample(buffer.channel(channel)[frame])?;
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

#[cfg(not(feature = "wav"))]
mod wav {
    use std::path::Path;

    use crate::Result;
    use crate::buffer::Buffer;

    pub(super) fn decode(path: &Path) -> Result<Buffer> {
        Err(super::unavailable(path))
    }

    pub(super) fn encode(path: &Path, _buffer: &Buffer) -> Result<()> {
        Err(super::unavailable(path))
    }
}
