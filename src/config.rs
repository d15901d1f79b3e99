use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub story: StoryConfig,
    pub playback: PlaybackConfig,
}

/// Clip capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture device path (e.g., /dev/video0)
    pub device: String,
    /// Seconds between continuous-mode cycles
    pub interval_secs: u64,
    /// Bound on how long to wait for a recorded clip
    pub recording_timeout_secs: u64,
    /// Length of each recorded clip
    pub clip_duration_secs: u64,
}

/// Story service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoryConfig {
    /// Story service endpoint URL
    pub endpoint: String,
    /// Requested story length in words
    pub length: u32,
    /// Narration voice identifier
    pub voice: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Weather description sent as prompt context
    pub weather: String,
}

/// Playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Start playing newly enqueued stories when nothing is playing
    pub autoplay: bool,
    /// Output device name (None = system default)
    pub output_device: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: defaults::DEFAULT_CAPTURE_DEVICE.to_string(),
            interval_secs: defaults::CYCLE_INTERVAL_SECS,
            recording_timeout_secs: defaults::RECORDING_TIMEOUT_SECS,
            clip_duration_secs: defaults::CLIP_DURATION_SECS,
        }
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/story".to_string(),
            length: defaults::STORY_LENGTH,
            voice: defaults::STORY_VOICE.to_string(),
            timeout_secs: defaults::SERVICE_TIMEOUT_SECS,
            weather: defaults::DEFAULT_WEATHER.to_string(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            output_device: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - STORYCAM_ENDPOINT → story.endpoint
    /// - STORYCAM_VOICE → story.voice
    /// - STORYCAM_DEVICE → capture.device
    /// - STORYCAM_INTERVAL → capture.interval_secs (plain seconds)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("STORYCAM_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.story.endpoint = endpoint;
        }
        if let Ok(voice) = std::env::var("STORYCAM_VOICE")
            && !voice.is_empty()
        {
            self.story.voice = voice;
        }
        if let Ok(device) = std::env::var("STORYCAM_DEVICE")
            && !device.is_empty()
        {
            self.capture.device = device;
        }
        if let Ok(interval) = std::env::var("STORYCAM_INTERVAL")
            && let Ok(secs) = interval.parse::<u64>()
            && secs > 0
        {
            self.capture.interval_secs = secs;
        }
        self
    }

    /// Default configuration file path: `<config dir>/storycam/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("storycam")
            .join("config.toml")
    }
}
