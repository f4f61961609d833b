//! Live output: a device callback rendering a shared graph.

use std::sync::Arc;

use parking_lot::Mutex;
use rivulet_config::GraphConfig;
use rivulet_core::Graph;

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle, backend_by_name};
use crate::{Error, Result};

/// A graph shared between control code and the audio callback.
pub type SharedGraph = Arc<Mutex<Graph>>;

/// Wrap a graph for use with [`AudioOut::start`].
pub fn shared(graph: Graph) -> SharedGraph {
    Arc::new(Mutex::new(graph))
}

/// Render `data.len() / channels` frames into an interleaved device buffer.
///
/// Renders in chunks no larger than the graph's block size. Device channels
/// beyond the sink's width are zeroed.
fn render_interleaved(graph: &mut Graph, data: &mut [f32], channels: usize) -> rivulet_core::Result<()> {
    let frames = data.len() / channels;
    let max_block = graph.max_block_size();
    let mut offset = 0;
    while offset < frames {
        let n = max_block.min(frames - offset);
        graph.render(n)?;
        let sink = graph.node_output(graph.output())?;
        let width = sink.channels();
        let chunk = &mut data[offset * channels..(offset + n) * channels];
        for (f, frame) in chunk.chunks_exact_mut(channels).enumerate() {
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = if c < width { sink.channel(c)[f] } else { 0.0 };
            }
        }
        offset += n;
    }
    data[frames * channels..].fill(0.0);
    Ok(())
}

/// Drives a [`Graph`] from an output device.
///
/// The callback takes the graph lock with `try_lock` and emits silence when
/// control code holds it. A render error silences the stream for good and is
/// logged once.
///
/// ```rust,ignore
/// let config = GraphConfig::discover()?;
/// let graph = rivulet_io::shared(Graph::new(config.clone())?);
/// let mut out = AudioOut::init(&config)?;
/// out.start(Arc::clone(&graph))?;
/// ```
pub struct AudioOut {
    backend: Box<dyn AudioBackend>,
    config: BackendStreamConfig,
    stream: Option<StreamHandle>,
}

impl std::fmt::Debug for AudioOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioOut")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl AudioOut {
    /// Resolve the backend and output device named in `config`.
    ///
    /// Fails with [`Error::DeviceNotFound`] if a named device does not exist.
    pub fn init(config: &GraphConfig) -> Result<Self> {
        let backend = backend_by_name(config.output_backend.as_deref())?;
        Self::with_backend(backend, config)
    }

    /// Use an explicit backend.
    pub fn with_backend(backend: Box<dyn AudioBackend>, config: &GraphConfig) -> Result<Self> {
        config.validate()?;
        let mut stream_config = BackendStreamConfig::output(config);
        let device = backend.resolve_device(stream_config.device_name.as_deref(), true)?;
        stream_config.sample_rate = backend.actual_sample_rate(&stream_config);
        tracing::info!(
            backend = backend.name(),
            device = %device.name,
            sample_rate = stream_config.sample_rate,
            buffer_size = stream_config.buffer_size,
            "audio output initialized"
        );
        Ok(Self {
            backend,
            config: stream_config,
            stream: None,
        })
    }

    /// Start rendering `graph` to the device.
    ///
    /// The device runs at the graph's output width. If the device rate
    /// differs from the graph's, the graph is retuned to the device rate.
    /// Restarting replaces the previous stream.
    pub fn start(&mut self, graph: SharedGraph) -> Result<()> {
        self.stop();
        {
            let mut locked = graph.lock();
            let channels = u16::try_from(locked.output_channels())
                .map_err(|_| Error::Stream("too many output channels".to_string()))?;
            if channels == 0 {
                return Err(Error::Stream("graph output has no channels".to_string()));
            }
            self.config.channels = channels;
            let rate = self.config.sample_rate as f32;
            if locked.sample_rate() != rate {
                tracing::warn!(
                    graph = locked.sample_rate(),
                    device = rate,
                    "graph sample rate differs from device, retuning"
                );
                locked.set_sample_rate(rate)?;
            }
        }

        let channels = usize::from(self.config.channels);
        let mut failed = false;
        let callback = move |data: &mut [f32]| {
            if failed {
                data.fill(0.0);
                return;
            }
            let Some(mut graph) = graph.try_lock() else {
                data.fill(0.0);
                return;
            };
            if let Err(e) = render_interleaved(&mut graph, data, channels) {
                tracing::error!(error = %e, "render failed, silencing output");
                failed = true;
                data.fill(0.0);
            }
        };
        let on_error = |err: &str| tracing::error!(error = err, "output stream error");

        let stream = self
            .backend
            .build_output_stream(&self.config, Box::new(callback), Box::new(on_error))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop the stream. The graph is left intact.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!(backend = self.backend.name(), "audio output stopped");
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

    /// Device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Device buffer size in frames.
    pub fn buffer_size(&self) -> u32 {
        self.config.buffer_size
    }

    /// Interleaved channel count of the running (or last) stream.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
