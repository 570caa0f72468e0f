//! Bootstrap configuration for mono-source
//!
//! Settings come from an optional TOML file; command-line arguments override
//! individual values. Missing keys fall back to built-in defaults.
//!
//! ```toml
//! samplerate = 22050
//! hop_size = 256
//!
//! [resampling]
//! enabled = true
//! quality = "linear"
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use crate::resampler::ResampleQuality;
use crate::source::SourceOptions;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Reader configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Output sample rate in Hz (0 = file's native rate)
    #[serde(default)]
    pub samplerate: u32,

    /// Output samples per read
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,

    #[serde(default)]
    pub resampling: ResamplingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resampling configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResamplingConfig {
    /// Allow rate conversion at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub quality: ResampleQuality,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_hop_size() -> usize {
    512
}

fn default_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            samplerate: 0,
            hop_size: default_hop_size(),
            resampling: ResamplingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            quality: ResampleQuality::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SourceConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;

        if config.hop_size == 0 {
            return Err(Error::Config("hop_size must be positive".to_string()));
        }

        Ok(config)
    }

    /// Reader options implied by this configuration
    pub fn options(&self) -> SourceOptions {
        if self.resampling.enabled {
            SourceOptions::with_quality(self.resampling.quality)
        } else {
            SourceOptions::without_resampling()
        }
    }
}
