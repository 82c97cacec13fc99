//! Configuration loaded from `~/.config/telemetry-overlay/config.toml`
//!
//! ```toml
//! sync_offset_ms = -350
//! output_path = "annotated.mp4"
//!
//! [ffmpeg]
//! video_codec = "libx264"
//! crf = 18
//!
//! [pipeline]
//! io_timeout_secs = 30
//! progress_interval = 600
//!
//! [overlay]
//! text_scale = 3
//! ```
//!
//! Every key is optional. Command-line flags take precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::overlay::OverlayStyle;
use crate::pipeline::PipelineConfig;
use crate::video::FfmpegConfig;

/// `[pipeline]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Limit on each frame read/write, in seconds
    pub io_timeout_secs: Option<u64>,
    /// Log progress every N frames (0 disables)
    pub progress_interval: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            io_timeout_secs: None,
            progress_interval: PipelineConfig::default().progress_interval,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shift applied to every telemetry lookup (ms)
    pub sync_offset_ms: i64,
    /// Destination for the annotated video
    pub output_path: Option<PathBuf>,
    pub ffmpeg: FfmpegConfig,
    pub pipeline: PipelineSection,
    pub overlay: OverlayStyle,
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !path.exists() {
            if required {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Pipeline settings derived from this configuration
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sync_offset_ms: self.sync_offset_ms,
            io_timeout: self.pipeline.io_timeout_secs.map(Duration::from_secs),
            progress_interval: self.pipeline.progress_interval,
            style: self.overlay.clone(),
        }
    }
}

/// Return the path to the default config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telemetry-overlay")
        .join("config.toml")
}
