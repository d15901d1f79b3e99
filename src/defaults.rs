//! Default configuration constants for storycam.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default continuous-mode cycle interval in seconds.
///
/// A new capture cycle begins on each tick, provided the previous cycle has
/// already finished. Ticks that fire while a cycle is still in flight are
/// dropped, not queued.
pub const CYCLE_INTERVAL_SECS: u64 = 30;

/// Maximum time to wait for the recorder to produce a clip, in seconds.
///
/// Recorders typically deliver in ~3 seconds; the bound only exists so a
/// wedged capture backend cannot stall the cycle loop forever.
pub const RECORDING_TIMEOUT_SECS: u64 = 30;

/// Default duration of each recorded clip in seconds.
pub const CLIP_DURATION_SECS: u64 = 3;

/// Number of frames scored concurrently during sharpness selection.
///
/// Bounds CPU and memory while still overlapping decode and convolution
/// work across frames.
pub const SCORING_CONCURRENCY: usize = 4;

/// Default requested story length in words.
pub const STORY_LENGTH: u32 = 200;

/// Default narration voice identifier sent to the story service.
pub const STORY_VOICE: &str = "af_heart";

/// Story service request timeout in seconds.
///
/// Story generation plus narration synthesis is slow; 60 seconds covers the
/// worst observed server-side processing times with margin.
pub const SERVICE_TIMEOUT_SECS: u64 = 60;

/// Playback progress sampler interval in milliseconds.
pub const PROGRESS_INTERVAL_MS: u64 = 100;

/// Weather description used when no provider is configured or the lookup fails.
pub const DEFAULT_WEATHER: &str = "clear sky";

/// Default V4L2 capture device path.
pub const DEFAULT_CAPTURE_DEVICE: &str = "/dev/video0";

/// Frames per second sampled out of a recorded clip during extraction.
///
/// 4 fps over a 3 second clip yields ~12 candidate frames, enough spread to
/// catch a sharp moment without making the scoring pass expensive.
pub const EXTRACTION_FPS: f64 = 4.0;
