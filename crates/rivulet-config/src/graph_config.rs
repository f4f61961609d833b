//! Graph and device configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::paths::{CONFIG_FILE_NAME, ensure_user_config_dir, user_config_path};

/// Environment variable overriding [`GraphConfig::output_backend`].
pub const ENV_BACKEND: &str = "RIVULET_BACKEND";
/// Environment variable overriding [`GraphConfig::output_device`].
pub const ENV_OUTPUT_DEVICE: &str = "RIVULET_OUTPUT_DEVICE";
/// Environment variable overriding [`GraphConfig::input_device`].
pub const ENV_INPUT_DEVICE: &str = "RIVULET_INPUT_DEVICE";
/// Environment variable overriding [`GraphConfig::sample_rate`].
pub const ENV_SAMPLE_RATE: &str = "RIVULET_SAMPLE_RATE";
/// Environment variable overriding [`GraphConfig::output_buffer_size`].
pub const ENV_OUTPUT_BUFFER_SIZE: &str = "RIVULET_OUTPUT_BUFFER_SIZE";
/// Environment variable overriding [`GraphConfig::input_buffer_size`].
pub const ENV_INPUT_BUFFER_SIZE: &str = "RIVULET_INPUT_BUFFER_SIZE";
/// Environment variable overriding [`GraphConfig::output_channels`].
pub const ENV_OUTPUT_CHANNELS: &str = "RIVULET_OUTPUT_CHANNELS";

/// Settings a [`Graph`](https://docs.rs/rivulet-core) and its device adapters are built from.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// output_backend = "offline"
/// sample_rate = 48000
/// output_buffer_size = 128
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Audio backend name (`"cpal"`, `"offline"`). `None` picks the platform default.
    pub output_backend: Option<String>,
    /// Output device name filter. `None` uses the backend's default device.
    pub output_device: Option<String>,
    /// Input device name filter. `None` uses the backend's default device.
    pub input_device: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per output device callback.
    pub output_buffer_size: u32,
    /// Frames per input device callback.
    pub input_buffer_size: u32,
    /// Channel count of the output sink.
    pub output_channels: u16,
    /// Largest block a single render may produce. Node output blocks are sized to this.
    pub max_block_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            output_backend: None,
            output_device: None,
            input_device: None,
            sample_rate: 44100,
            output_buffer_size: 256,
            input_buffer_size: 256,
            output_channels: 2,
            max_block_size: 2048,
        }
    }
}

impl GraphConfig {
    /// Load a configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Ok(toml::from_str(&text)?)
    }

    /// Save the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        std::fs::write(path, text).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Write to the user configuration file, creating its directory.
    ///
    /// Returns the path written.
    pub fn save_user(&self) -> Result<PathBuf, ConfigError> {
        let path = ensure_user_config_dir()?.join(CONFIG_FILE_NAME);
        self.save(&path)?;
        Ok(path)
    }

    /// Build the effective user configuration.
    ///
    /// Reads the user config file if one exists, applies `RIVULET_*`
    /// environment overrides, then validates the result.
    pub fn discover() -> Result<Self, ConfigError> {
        let path = user_config_path();
        let mut config = if path.is_file() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup such as the process environment.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_BACKEND) {
            self.output_backend = Some(v);
        }
        if let Some(v) = get(ENV_OUTPUT_DEVICE) {
            self.output_device = Some(v);
        }
        if let Some(v) = get(ENV_INPUT_DEVICE) {
            self.input_device = Some(v);
        }
        if let Some(v) = get(ENV_SAMPLE_RATE) {
            self.sample_rate = parse_env(ENV_SAMPLE_RATE, v)?;
        }
        if let Some(v) = get(ENV_OUTPUT_BUFFER_SIZE) {
            self.output_buffer_size = parse_env(ENV_OUTPUT_BUFFER_SIZE, v)?;
        }
        if let Some(v) = get(ENV_INPUT_BUFFER_SIZE) {
            self.input_buffer_size = parse_env(ENV_INPUT_BUFFER_SIZE, v)?;
        }
        if let Some(v) = get(ENV_OUTPUT_CHANNELS) {
            self.output_channels = parse_env(ENV_OUTPUT_CHANNELS, v)?;
        }
        Ok(())
    }

    /// Check that every numeric field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid(
                "sample_rate",
                "must be greater than zero",
            ));
        }
        if self.output_buffer_size == 0 {
            return Err(ConfigError::invalid(
                "output_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.input_buffer_size == 0 {
            return Err(ConfigError::invalid(
                "input_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.output_channels == 0 {
            return Err(ConfigError::invalid(
                "output_channels",
                "must be greater than zero",
            ));
        }
        if self.max_block_size == 0 {
            return Err(ConfigError::invalid(
                "max_block_size",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
