//! storycam - Continuous camera-to-story narration pipeline
//!
//! Records a short clip on a timer, picks the sharpest frame, sends it to a
//! generative story service, and plays the narrated result through a managed
//! audio queue.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod capture;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod generator;
pub mod playback;
pub mod scoring;
pub mod story;

// Core traits (capture → select → narrate → play)
pub use capture::{FrameExtractor, Recorder};
pub use playback::AudioOutput;
pub use story::{StoryService, WeatherProvider};

// Pipeline
pub use generator::{CyclePhase, GenerationOrchestrator, GeneratorConfig, GeneratorStatus};
pub use playback::{
    AudioQueue, AudioQueueItem, PlaybackController, PlaybackSnapshot, PlaybackState, QueuePlayer,
};
pub use scoring::FrameSelector;

// Error handling
pub use error::{Result, StorycamError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
