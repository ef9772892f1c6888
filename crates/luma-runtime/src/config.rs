//! Capture configuration

use std::time::Duration;

use luma_core::{FrameSize, LumaError};
use luma_filter::Filter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target fps must be between 1 and 240, got {0}")]
    InvalidFps(u32),

    #[error("invalid frame size {0}")]
    InvalidFrameSize(FrameSize),

    #[error("tick interval must be non-zero")]
    ZeroTickInterval,

    #[error("invalid display filter: {0}")]
    Filter(#[from] LumaError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capture loop configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frames processed per second at most
    pub target_fps: u32,
    /// Requested frame width; the source has the final say
    pub width: u32,
    pub height: u32,
    /// How often the loop wakes up to check whether a frame is due
    #[serde(with = "humantime_serde_str")]
    pub tick_interval: Duration,
    /// Filter applied to displayed frames, e.g. `"grayscale"` or `"threshold:100"`
    pub display_filter: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            target_fps: 30,
            width: 640,
            height: 480,
            tick_interval: Duration::from_millis(16),
            display_filter: None,
        }
    }
}

impl CaptureConfig {
    pub const MAX_FPS: u32 = 240;

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CaptureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_fps == 0 || self.target_fps > Self::MAX_FPS {
            return Err(ConfigError::InvalidFps(self.target_fps));
        }
        let size = self.frame_size();
        if size.is_empty() {
            return Err(ConfigError::InvalidFrameSize(size));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        self.parsed_display_filter()?;
        Ok(())
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Minimum time between two processed frames
    pub fn target_interval(&self) -> Duration {
        target_interval(self.target_fps)
    }

    pub fn parsed_display_filter(&self) -> Result<Option<Filter>, ConfigError> {
        match &self.display_filter {
            Some(name) => Ok(Some(name.parse()?)),
            None => Ok(None),
        }
    }
}

pub(crate) fn target_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Serde adapter for human-readable durations like `"16ms"` or `"1s 500ms"`
mod humantime_serde_str {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}
