//! Audio device adapters for rivulet graphs.
//!
//! This crate connects a [`Graph`](rivulet_core::Graph) to the outside world:
//!
//! - **Output**: [`AudioOut`] renders a [`SharedGraph`] from a device callback
//! - **Input**: [`AudioIn`] captures into a lock-free ring read by the
//!   [`AudioInput`] node
//! - **Backends**: [`AudioBackend`] with [`CpalBackend`] (native) and
//!   [`OfflineBackend`] (headless), chosen by name with [`backend_by_name`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivulet_core::{Graph, GraphConfig};
//! use rivulet_io::{AudioOut, shared};
//! use rivulet_nodes::{Sine, scale};
//!
//! let config = GraphConfig::discover()?;
//! let graph = shared(Graph::new(config.clone())?);
//! {
//!     let mut g = graph.lock();
//!     let tone = g.add(Sine::new());
//!     let quiet = scale(&mut g, tone, 0.1)?;
//!     g.play(quiet)?;
//! }
//!
//! let mut out = AudioOut::init(&config)?;
//! out.start(graph.clone())?;
//! Graph::wait(Some(std::time::Duration::from_secs(2)));
//! out.close();
//! ```

pub mod backend;
mod cpal_backend;
mod input;
mod offline;
mod output;

pub use backend::{
    AudioBackend, AudioDevice, BACKEND_NAMES, BackendStreamConfig, StreamHandle, backend_by_name,
};
pub use cpal_backend::CpalBackend;
pub use input::{AudioIn, AudioInput};
pub use offline::{OFFLINE_DEVICE, OfflineBackend, OutputTap};
pub use output::{AudioOut, SharedGraph, shared};

/// Error types for device I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Graph operation failed.
    #[error(transparent)]
    Core(#[from] rivulet_core::Error),

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] rivulet_config::ConfigError),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// No backend is known by this name.
    #[error("Unknown audio backend '{0}' (expected one of: cpal, offline)")]
    UnknownBackend(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for device I/O.
pub type Result<T> = std::result::Result<T, Error>;
