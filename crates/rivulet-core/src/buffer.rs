//! Multi-channel sample storage with pluggable offset mapping.
//!
//! A [`Buffer`] stores `[channel][frame]` samples. Reads go through
//! [`Buffer::get`], which first maps a caller-supplied *offset* to a
//! fractional frame and then reads with the buffer's [`Interpolation`]:
//!
//! | mapping                    | offset domain | frame                          |
//! |----------------------------|---------------|--------------------------------|
//! | [`OffsetMapping::Frames`]     | frames        | `offset`                       |
//! | [`OffsetMapping::Envelope`]   | `[0, 1]`      | `offset * (n - 1)`             |
//! | [`OffsetMapping::WaveShaper`] | `[-1, 1]`     | `(offset + 1) / 2 * (n - 1)`   |
//!
//! Buffers are shared read-only with nodes as `Arc<Buffer>`.

use std::path::Path;

use crate::{Error, Result};

/// Sample rate assumed for buffers created without one.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Default length of envelope and waveshaper tables.
pub const DEFAULT_TABLE_LENGTH: usize = 2048;

/// How fractional frames are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Truncate to the frame below.
    None,
    /// Blend the frames either side by the fractional part.
    #[default]
    Linear,
}

/// How a read offset maps to a frame index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetMapping {
    /// Offset is a frame index.
    #[default]
    Frames,
    /// Offset in `[0, 1]` spans the whole buffer.
    Envelope,
    /// Offset in `[-1, 1]` spans the whole buffer.
    WaveShaper,
}

/// Standard envelope curves for [`Buffer::envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// Rises 0 → 1 over the first half, falls back to 0.
    Triangle,
    /// Falls linearly from 1 to 0.
    LinearDecay,
    /// Raised cosine window.
    Hanning,
    /// Constant 1.
    Rectangular,
}

/// Multi-channel float sample storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    data: Vec<Vec<f32>>,
    num_frames: usize,
    sample_rate: f32,
    interpolation: Interpolation,
    mapping: OffsetMapping,
}

impl Buffer {
    /// Create a zeroed buffer.
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        Self {
            data: vec![vec![0.0; num_frames]; num_channels],
            num_frames,
            sample_rate: DEFAULT_SAMPLE_RATE,
            interpolation: Interpolation::default(),
            mapping: OffsetMapping::Frames,
        }
    }

    /// Create a buffer from per-channel sample vectors.
    ///
    /// All channels must have the same length.
    pub fn from_channels(data: Vec<Vec<f32>>, sample_rate: f32) -> Result<Self> {
        let num_frames = data.first().map_or(0, Vec::len);
        if data.iter().any(|ch| ch.len() != num_frames) {
            return Err(Error::InvalidConfiguration(
                "buffer channels must have equal length".to_string(),
            ));
        }
        if sample_rate <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "buffer sample rate must be positive, got {sample_rate}"
            )));
        }
        Ok(Self {
            data,
            num_frames,
            sample_rate,
            interpolation: Interpolation::default(),
            mapping: OffsetMapping::Frames,
        })
    }

    /// Create a mono buffer from one channel of samples.
    pub fn from_mono(samples: Vec<f32>, sample_rate: f32) -> Result<Self> {
        Self::from_channels(vec![samples], sample_rate)
    }

    /// Create a mono envelope table read with offsets in `[0, 1]`.
    pub fn envelope(shape: EnvelopeShape, num_frames: usize) -> Self {
        let mut buffer = Self::new(1, num_frames).with_mapping(OffsetMapping::Envelope);
        match shape {
            EnvelopeShape::Triangle => {
                buffer.fill_with(|x| if x < 0.5 { 2.0 * x } else { 2.0 * (1.0 - x) });
            }
            EnvelopeShape::LinearDecay => buffer.fill_with(|x| 1.0 - x),
            EnvelopeShape::Hanning => {
                buffer.fill_with(|x| 0.5 - 0.5 * (std::f32::consts::TAU * x).cos());
            }
            EnvelopeShape::Rectangular => buffer.fill(1.0),
        }
        buffer
    }

    /// Create a mono waveshaper table: `transfer(x)` for `x` in `[-1, 1]`.
    pub fn waveshaper(num_frames: usize, transfer: impl Fn(f32) -> f32) -> Self {
        let mut buffer = Self::new(1, num_frames).with_mapping(OffsetMapping::WaveShaper);
        buffer.fill_with(transfer);
        buffer
    }

    /// Decode an audio file through the codec boundary.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        crate::codec::decode(path.as_ref())
    }

    /// Encode this buffer to an audio file through the codec boundary.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::codec::encode(path.as_ref(), self)
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the interpolation mode.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the offset mapping.
    pub fn with_mapping(mut self, mapping: OffsetMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.data.len()
    }

    /// Frames per channel.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.num_frames as f32 / self.sample_rate
    }

    /// Current interpolation mode.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Change the interpolation mode.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Current offset mapping.
    pub fn mapping(&self) -> OffsetMapping {
        self.mapping
    }

    /// Samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range.
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.data[channel]
    }

    /// Mutable samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range.
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.data[channel]
    }

    /// Map a read offset to a fractional frame index.
    pub fn offset_to_frame(&self, offset: f64) -> f64 {
        let last = self.num_frames.saturating_sub(1) as f64;
        match self.mapping {
            OffsetMapping::Frames => offset,
            OffsetMapping::Envelope => offset * last,
            OffsetMapping::WaveShaper => (offset + 1.0) * 0.5 * last,
        }
    }

    /// Map a frame index back to its read offset.
    pub fn frame_to_offset(&self, frame: f64) -> f64 {
        let last = self.num_frames.saturating_sub(1) as f64;
        if last == 0.0 {
            return match self.mapping {
                OffsetMapping::WaveShaper => -1.0,
                _ => 0.0,
            };
        }
        match self.mapping {
            OffsetMapping::Frames => frame,
            OffsetMapping::Envelope => frame / last,
            OffsetMapping::WaveShaper => frame / last * 2.0 - 1.0,
        }
    }

    /// Read `channel` at `offset` through the mapping and interpolation mode.
    ///
    /// Offsets past either end read the first or last frame. Returns 0.0 for
    /// an out-of-range channel or an empty buffer.
    pub fn get(&self, channel: usize, offset: f64) -> f32 {
        self.get_frame(channel, self.offset_to_frame(offset))
    }

    /// Read `channel` at a fractional frame index.
    pub fn get_frame(&self, channel: usize, frame: f64) -> f32 {
        let Some(samples) = self.data.get(channel) else {
            return 0.0;
        };
        if self.num_frames == 0 {
            return 0.0;
        }
        let last = self.num_frames - 1;
        let frame = frame.clamp(0.0, last as f64);
        let lo = frame.floor() as usize;
        match self.interpolation {
            Interpolation::None => samples[lo],
            Interpolation::Linear => {
                let hi = (lo + 1).min(last);
                let frac = (frame - lo as f64) as f32;
                samples[lo] + (samples[hi] - samples[lo]) * frac
            }
        }
    }

    /// Write one sample. Returns `false` if `channel` or `frame` is out of range.
    pub fn set(&mut self, channel: usize, frame: usize, value: f32) -> bool {
        match self.data.get_mut(channel).and_then(|ch| ch.get_mut(frame)) {
            Some(sample) => {
                *sample = value;
                true
            }
            None => false,
        }
    }

    /// Set every sample of every channel to `value`.
    pub fn fill(&mut self, value: f32) {
        for channel in &mut self.data {
            channel.fill(value);
        }
    }

    /// Fill every channel with `f(offset)`, where `offset` is each frame's read offset.
    pub fn fill_with(&mut self, f: impl Fn(f32) -> f32) {
        for frame in 0..self.num_frames {
            let value = f(self.frame_to_offset(frame as f64) as f32);
            for channel in &mut self.data {
                channel[frame] = value;
            }
        }
    }

    /// Partition into independent buffers of `frames_per_part` frames.
    ///
    /// A trailing partial part is dropped. Parts keep this buffer's sample
    /// rate and interpolation mode but own their samples.
    pub fn split(&self, frames_per_part: usize) -> Vec<Buffer> {
        if frames_per_part == 0 {
            return Vec::new();
        }
        let parts = self.num_frames / frames_per_part;
        (0..parts)
            .map(|part| {
                let start = part * frames_per_part;
                let end = start + frames_per_part;
                Buffer {
                    data: self.data.iter().map(|ch| ch[start..end].to_vec()).collect(),
                    num_frames: frames_per_part,
                    sample_rate: self.sample_rate,
                    interpolation: self.interpolation,
                    mapping: self.mapping,
                }
            })
            .collect()
    }
}
