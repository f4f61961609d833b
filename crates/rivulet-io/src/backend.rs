//! Pluggable audio backend abstraction.
//!
//! [`AudioBackend`] decouples the graph adapters from any specific platform
//! audio API. Two implementations ship with this crate:
//!
//! - [`CpalBackend`](crate::CpalBackend): the native platform API through cpal
//!   (ALSA, CoreAudio, WASAPI, AAudio)
//! - [`OfflineBackend`](crate::OfflineBackend): a headless paced thread, for
//!   servers and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │        AudioOut / AudioIn        │
//! └──────────────┬───────────────────┘
//!                │ uses AudioBackend trait
//!                ▼
//! ┌──────────────────────────────────┐
//! │        AudioBackend trait        │
//! │  list_devices / build_streams    │
//! └──────────────┬───────────────────┘
//!                │ implemented by
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌──────────────┐
//! │ CpalBackend │  │OfflineBackend│
//! └─────────────┘  └──────────────┘
//! ```
//!
//! Callbacks are boxed closures, so the trait is object-safe and backends can
//! be chosen at runtime by name ([`backend_by_name`]). Streams come back as a
//! type-erased [`StreamHandle`] that stops the stream on drop.

use rivulet_config::GraphConfig;

use crate::{CpalBackend, Error, OfflineBackend, Result};

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

impl AudioDevice {
    /// Case-insensitive substring match against the device name.
    pub fn matches(&self, search: &str) -> bool {
        self.name.to_lowercase().contains(&search.to_lowercase())
    }
}

/// Configuration for building an audio stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Optional device name filter (uses the system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

impl BackendStreamConfig {
    /// Output stream settings from a graph configuration.
    pub fn output(config: &GraphConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            buffer_size: config.output_buffer_size,
            channels: config.output_channels,
            device_name: config.output_device.clone(),
        }
    }

    /// Input stream settings from a graph configuration.
    pub fn input(config: &GraphConfig, channels: u16) -> Self {
        Self {
            sample_rate: config.sample_rate,
            buffer_size: config.input_buffer_size,
            channels,
            device_name: config.input_device.clone(),
        }
    }
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops playback
/// or capture.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Output callback: fill a buffer of interleaved samples, `[L0, R0, L1, R1, ...]`.
///
/// Runs on the real-time audio thread. Must not block, allocate, or perform I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Input callback: receives captured interleaved samples.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Called with a message when the backend reports a streaming error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Platform audio API.
pub trait AudioBackend: Send {
    /// Backend name as accepted by [`backend_by_name`].
    fn name(&self) -> &'static str;

    /// List all available audio devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// The default input device, if any.
    fn default_input_device(&self) -> Result<Option<AudioDevice>>;

    /// Build and start an output stream. Dropping the handle stops it.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Build and start an input stream. Dropping the handle stops it.
    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// The sample rate the backend will actually run `config` at.
    ///
    /// Defaults to the requested rate.
    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> u32 {
        config.sample_rate
    }

    /// Resolve a device by name filter, or the default when `name` is `None`.
    ///
    /// Fails with [`Error::DeviceNotFound`] if nothing matches and
    /// [`Error::NoDevice`] if there is no default.
    fn resolve_device(&self, name: Option<&str>, output: bool) -> Result<AudioDevice> {
        let kind = if output { "output" } else { "input" };
        match name {
            Some(search) => self
                .list_devices()?
                .into_iter()
                .find(|d| (if output { d.is_output } else { d.is_input }) && d.matches(search))
                .ok_or_else(|| Error::DeviceNotFound(format!("no {kind} device matching '{search}'"))),
            None => {
                let device = if output {
                    self.default_output_device()?
                } else {
                    self.default_input_device()?
                };
                device.ok_or(Error::NoDevice)
            }
        }
    }
}

/// Names accepted by [`backend_by_name`].
pub const BACKEND_NAMES: &[&str] = &["cpal", "offline"];

/// Construct a backend by name. `None` selects the native platform backend.
pub fn backend_by_name(name: Option<&str>) -> Result<Box<dyn AudioBackend>> {
    match name.map(str::to_lowercase).as_deref() {
        None | Some("cpal") => Ok(Box::new(CpalBackend::new())),
        Some("offline") => Ok(Box::new(OfflineBackend::new())),
        Some(other) => Err(Error::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_config_follows_graph_config() {
        let config = GraphConfig {
            sample_rate: 48000,
            output_buffer_size: 128,
            input_buffer_size: 64,
            output_channels: 4,
            output_device: Some("speakers".into()),
            input_device: Some("mic".into()),
            ..GraphConfig::default()
        };
        let output = BackendStreamConfig::output(&config);
        assert_eq!(output.sample_rate, 48000);
        assert_eq!(output.buffer_size, 128);
        assert_eq!(output.channels, 4);
        assert_eq!(output.device_name.as_deref(), Some("speakers"));

        let input = BackendStreamConfig::input(&config, 1);
        assert_eq!(input.buffer_size, 64);
        assert_eq!(input.channels, 1);
        assert_eq!(input.device_name.as_deref(), Some("mic"));
    }

    #[test]
    fn device_match_ignores_case() {
        let device = AudioDevice {
            name: "USB Audio CODEC".into(),
            is_input: true,
            is_output: true,
            default_sample_rate: 48000,
        };
        assert!(device.matches("usb audio"));
        assert!(!device.matches("hdmi"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            backend_by_name(Some("jack")),
            Err(Error::UnknownBackend(name)) if name == "jack"
        ));
        assert_eq!(backend_by_name(Some("Offline")).unwrap().name(), "offline");
    }

    #[test]
    fn stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }
}
