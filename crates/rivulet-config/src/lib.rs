//! Configuration for the rivulet audio graph engine.
//!
//! A [`GraphConfig`] describes everything a graph and its device adapters need
//! at construction time: backend and device selection, sample rate, buffer
//! sizes, and the output channel count.
//!
//! Configuration is resolved in three layers:
//!
//! 1. Built-in defaults ([`GraphConfig::default`])
//! 2. The user config file ([`paths::user_config_path`]), if present
//! 3. `RIVULET_*` environment variables
//!
//! # Example
//!
//! ```rust,no_run
//! use rivulet_config::GraphConfig;
//!
//! let config = GraphConfig::discover().unwrap();
//! println!("rendering at {} Hz", config.sample_rate);
//! ```

mod error;
mod graph_config;

/// Platform-specific configuration paths.
pub mod paths;

pub use error::ConfigError;
pub use graph_config::{
    ENV_BACKEND, ENV_INPUT_BUFFER_SIZE, ENV_INPUT_DEVICE, ENV_OUTPUT_BUFFER_SIZE,
    ENV_OUTPUT_CHANNELS, ENV_OUTPUT_DEVICE, ENV_SAMPLE_RATE, GraphConfig,
};
pub use paths::{ensure_user_config_dir, user_config_dir, user_config_path};
