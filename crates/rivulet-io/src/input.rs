//! Live input: device capture feeding a graph node through a lock-free ring.
//!
//! ```text
//! device callback ──push──▶ RingWriter ══ SPSC ring ══ RingReader ──▶ AudioInput::process
//! ```
//!
//! The ring holds several render blocks of frames. A full ring drops the
//! newest frames; an empty one yields silence and counts an underrun.

use std::sync::Arc;

use parking_lot::Mutex;
use rivulet_config::GraphConfig;
use rivulet_core::{
    AudioBlock, ChannelLayout, ProcessContext, Processor, RingReader, RingStats, RingWriter,
    input_ring,
};

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle, backend_by_name};
use crate::{Error, Result};

/// Graph node emitting captured device audio.
///
/// Created together with its [`AudioIn`]; add it to a graph like any other
/// processor.
pub struct AudioInput {
    reader: RingReader,
}

impl std::fmt::Debug for AudioInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioInput")
            .field("channels", &self.reader.channels())
            .field("available", &self.reader.available())
            .finish()
    }
}

impl AudioInput {
    /// Frames waiting in the ring.
    pub fn available(&self) -> usize {
        self.reader.available()
    }
}

impl Processor for AudioInput {
    fn name(&self) -> &'static str {
        "audio-in"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(0, self.reader.channels())
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        self.reader.read_into(out, ctx.num_frames());
    }
}

/// Captures from an input device into the ring read by [`AudioInput`].
pub struct AudioIn {
    backend: Box<dyn AudioBackend>,
    config: BackendStreamConfig,
    writer: Arc<Mutex<RingWriter>>,
    stats: Arc<RingStats>,
    stream: Option<StreamHandle>,
}

impl std::fmt::Debug for AudioIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioIn")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl AudioIn {
    /// Resolve the backend and input device named in `config`, capturing
    /// `channels` channels.
    pub fn init(config: &GraphConfig, channels: u16) -> Result<(Self, AudioInput)> {
        let backend = backend_by_name(config.output_backend.as_deref())?;
        Self::with_backend(backend, config, channels)
    }

    /// Use an explicit backend.
    pub fn with_backend(
        backend: Box<dyn AudioBackend>,
        config: &GraphConfig,
        channels: u16,
    ) -> Result<(Self, AudioInput)> {
        config.validate()?;
        if channels == 0 {
            return Err(Error::Stream("input needs at least one channel".to_string()));
        }
        let mut stream_config = BackendStreamConfig::input(config, channels);
        let device = backend.resolve_device(stream_config.device_name.as_deref(), false)?;
        stream_config.sample_rate = backend.actual_sample_rate(&stream_config);

        // room for the largest render as well as a device buffer
        let block = (config.input_buffer_size.max(config.output_buffer_size) as usize)
            .max(config.max_block_size);
        let (writer, reader) = input_ring(usize::from(channels), block);
        tracing::info!(
            backend = backend.name(),
            device = %device.name,
            channels,
            capacity_frames = block * rivulet_core::RING_BLOCKS,
            "audio input initialized"
        );

        let input = AudioIn {
            backend,
            config: stream_config,
            stats: writer.stats(),
            writer: Arc::new(Mutex::new(writer)),
            stream: None,
        };
        Ok((input, AudioInput { reader }))
    }

    /// Start capturing. Restarting replaces the previous stream.
    pub fn start(&mut self) -> Result<()> {
        self.stop();
        let writer = Arc::clone(&self.writer);
        // The callback is the only lock holder while a stream runs.
        let callback = move |data: &[f32]| {
            if let Some(mut writer) = writer.try_lock() {
                writer.push_interleaved(data);
            }
        };
        let on_error = |err: &str| tracing::error!(error = err, "input stream error");
        let stream =
            self.backend
                .build_input_stream(&self.config, Box::new(callback), Box::new(on_error))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop capturing. The ring keeps any frames not yet read.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            let stats = &self.stats;
            tracing::info!(
                dropped = stats.dropped_frames(),
                underruns = stats.underruns(),
                "audio input stopped"
            );
        }
    }

    /// Stop and release the device.
    pub fn close(mut self) {
        self.stop();
    }

    /// Whether a stream is running.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Overrun and underrun counters for the ring.
    pub fn stats(&self) -> Arc<RingStats> {
        Arc::clone(&self.stats)
    }

    /// Device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Device buffer size in frames.
    pub fn buffer_size(&self) -> u32 {
        self.config.buffer_size
    }

    /// Captured channel count.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}
