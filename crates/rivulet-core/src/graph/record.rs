//! Capturing the graph output to an audio file.
//!
//! The render thread pushes interleaved frames into an `rtrb` ring sized at
//! construction; a writer thread drains it into per-channel storage. Encoding
//! runs on the caller's thread in [`Graph::stop_recording`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};

use super::Graph;
use crate::block::AudioBlock;
use crate::buffer::Buffer;
use crate::{Error, Result, codec};

/// Seconds of output the ring holds before the writer must catch up.
const RING_SECONDS: f32 = 2.0;

/// How often the writer drains the ring.
const DRAIN_INTERVAL: Duration = Duration::from_millis(5);

type Take = Vec<Vec<f32>>;

pub(crate) struct Recorder {
    path: PathBuf,
    channels: usize,
    producer: Producer<f32>,
    dropped: u64,
    running: Arc<AtomicBool>,
    writer: Option<JoinHandle<Take>>,
}

impl Recorder {
    fn start(path: PathBuf, channels: usize, capacity_frames: usize) -> Result<Self> {
        let (producer, mut consumer) = RingBuffer::<f32>::new(capacity_frames * channels);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let writer = thread::Builder::new()
            .name("rivulet-recorder".to_string())
            .spawn(move || {
                let mut take = vec![Vec::new(); channels];
                loop {
                    let stopping = !flag.load(Ordering::Acquire);
                    drain(&mut consumer, &mut take);
                    if stopping {
                        return take;
                    }
                    thread::sleep(DRAIN_INTERVAL);
                }
            })?;
        Ok(Self {
            path,
            channels,
            producer,
            dropped: 0,
            running,
            writer: Some(writer),
        })
    }

    /// Push one block of the sink. Blocks that do not fit are dropped whole.
    pub fn capture(&mut self, block: &AudioBlock, num_frames: usize) {
        if self.producer.slots() < num_frames * self.channels {
            self.dropped += num_frames as u64;
            return;
        }
        let native = block.channels();
        for frame in 0..num_frames {
            for k in 0..self.channels {
                let sample = if native == 0 {
                    0.0
                } else {
                    block.channel(k % native)[frame]
                };
                if self.producer.push(sample).is_err() {
                    return;
                }
            }
        }
    }

    /// Stop the writer and collect everything captured.
    fn finish(mut self) -> Result<Take> {
        self.running.store(false, Ordering::Release);
        let writer = self
            .writer
            .take()
            .ok_or_else(|| std::io::Error::other("recorder writer already joined"))?;
        writer
            .join()
            .map_err(|_| Error::Io(std::io::Error::other("recorder writer panicked")))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Move every whole frame in the ring into `take`.
fn drain(consumer: &mut Consumer<f32>, take: &mut [Vec<f32>]) {
    let channels = take.len();
    let frames = consumer.slots() / channels;
    if let Ok(chunk) = consumer.read_chunk(frames * channels) {
        for (i, sample) in chunk.into_iter().enumerate() {
            take[i % channels].push(sample);
        }
    }
}

impl Graph {
    /// Start capturing the output sink. Stops and discards any recording in progress.
    ///
    /// `num_channels` defaults to the output width. Fails with
    /// [`Error::CodecUnavailable`] if `path` cannot be encoded by this build.
    pub fn start_recording(
        &mut self,
        path: impl AsRef<Path>,
        num_channels: Option<usize>,
    ) -> Result<()> {
        let path = path.as_ref();
        if !codec::is_supported(path) {
            return Err(Error::CodecUnavailable(path.display().to_string()));
        }
        let channels = num_channels.unwrap_or_else(|| self.output_channels());
        if channels == 0 {
            return Err(Error::InvalidConfiguration(
                "recording needs at least one channel".to_string(),
            ));
        }
        let capacity = ((self.sample_rate * RING_SECONDS) as usize).max(4 * self.max_block_size);
        self.recorder = None;
        self.recorder = Some(Recorder::start(path.to_path_buf(), channels, capacity)?);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_record: started {}", path.display());
        Ok(())
    }

    /// Whether a recording is in progress.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Stop capturing and encode everything recorded so far. Returns the file path.
    pub fn stop_recording(&mut self) -> Result<PathBuf> {
        let recorder = self.recorder.take().ok_or(Error::NotRecording)?;
        let path = recorder.path.clone();
        let _dropped = recorder.dropped;
        let take = recorder.finish()?;
        let buffer = Buffer::from_channels(take, self.sample_rate)?;
        buffer.save(&path)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            dropped_frames = _dropped,
            "graph_record: wrote {} frames to {}",
            buffer.num_frames(),
            path.display()
        );
        Ok(path)
    }
}
