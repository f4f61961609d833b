//! Lock-free sample ring between a capture callback and the render thread.
//!
//! [`input_ring`] returns a connected [`RingWriter`] / [`RingReader`] pair over
//! an `rtrb` single-producer single-consumer queue of interleaved samples.
//! Neither side allocates or blocks: the writer drops frames that do not fit,
//! the reader pads missing frames with silence. Both count those events.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::block::AudioBlock;

/// Blocks of headroom between writer and reader.
pub const RING_BLOCKS: usize = 4;

/// Overflow and underrun counters shared by both ends of a ring.
#[derive(Debug, Default)]
pub struct RingStats {
    dropped: AtomicU64,
    underruns: AtomicU64,
}

impl RingStats {
    /// Frames the writer discarded because the ring was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reads that found fewer frames than requested.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Create a ring for `channels` interleaved channels, sized for `block_size`-frame reads.
///
/// Capacity is [`RING_BLOCKS`] blocks, never less than one frame.
pub fn input_ring(channels: usize, block_size: usize) -> (RingWriter, RingReader) {
    let channels = channels.max(1);
    let capacity = (RING_BLOCKS * block_size * channels).max(channels);
    let (producer, consumer) = RingBuffer::<f32>::new(capacity);
    let stats = Arc::new(RingStats::default());
    (
        RingWriter {
            producer,
            channels,
            stats: Arc::clone(&stats),
        },
        RingReader {
            consumer,
            channels,
            stats,
        },
    )
}

/// Capture side of an input ring.
pub struct RingWriter {
    producer: Producer<f32>,
    channels: usize,
    stats: Arc<RingStats>,
}

impl RingWriter {
    /// Interleaved channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Push whole interleaved frames. Frames that do not fit are dropped.
    ///
    /// Returns the number of frames written. A trailing partial frame is ignored.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> usize {
        let frames = samples.len() / self.channels;
        let room = self.producer.slots() / self.channels;
        let written = frames.min(room);
        for &s in &samples[..written * self.channels] {
            if self.producer.push(s).is_err() {
                break;
            }
        }
        if written < frames {
            self.stats
                .dropped
                .fetch_add((frames - written) as u64, Ordering::Relaxed);
        }
        written
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<RingStats> {
        Arc::clone(&self.stats)
    }
}

/// Render side of an input ring.
pub struct RingReader {
    consumer: Consumer<f32>,
    channels: usize,
    stats: Arc<RingStats>,
}

impl RingReader {
    /// Interleaved channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames ready to read.
    pub fn available(&self) -> usize {
        self.consumer.slots() / self.channels
    }

    /// De-interleave up to `num_frames` frames into `out`.
    ///
    /// Channels of `out` beyond the ring's width are zeroed; ring channels
    /// beyond `out`'s width are consumed and discarded. Missing frames are
    /// filled with silence. Returns the number of frames read.
    pub fn read_into(&mut self, out: &mut AudioBlock, num_frames: usize) -> usize {
        let frames = self.available().min(num_frames);
        let width = out.channels();
        for frame in 0..frames {
            for channel in 0..self.channels {
                let sample = self.consumer.pop().unwrap_or(0.0);
                if channel < width {
                    out.channel_mut(channel)[frame] = sample;
                }
            }
        }
        for channel in out.channels_mut() {
            channel[frames..num_frames].fill(0.0);
        }
        for channel in self.channels..width {
            out.channel_mut(channel)[..frames].fill(0.0);
        }
        if frames < num_frames {
            self.stats.underruns.fetch_add(1, Ordering::Relaxed);
        }
        frames
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<RingStats> {
        Arc::clone(&self.stats)
    }
}
