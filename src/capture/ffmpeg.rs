//! Clip capture and frame extraction backed by the ffmpeg CLI.
//!
//! Both implementations shell out to `ffmpeg` and treat a missing binary or
//! a nonzero exit as a per-cycle failure; the pipeline keeps ticking.

use crate::capture::extractor::{Frame, FrameExtractor};
use crate::capture::recorder::{Recorder, VideoClip};
use crate::config::CaptureConfig;
use crate::defaults;
use crate::error::{Result, StorycamError};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Build a unique scratch path under the system temp directory.
fn scratch_path(prefix: &str, suffix: &str) -> PathBuf {
    let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("{prefix}_{}_{n}{suffix}", std::process::id()))
}

/// First ~200 chars of a process' stderr, for error messages.
fn stderr_snippet(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .trim()
        .chars()
        .take(200)
        .collect()
}

/// Records fixed-length clips from a V4L2 device via ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegRecorder {
    device: String,
    clip_secs: u64,
}

impl FfmpegRecorder {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            clip_secs: defaults::CLIP_DURATION_SECS,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            device: config.device.clone(),
            clip_secs: config.clip_duration_secs,
        }
    }

    /// Configure the clip duration in seconds
    pub fn with_clip_secs(mut self, secs: u64) -> Self {
        self.clip_secs = secs;
        self
    }

    fn record_args(&self, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "v4l2".to_string(),
            "-i".to_string(),
            self.device.clone(),
            "-t".to_string(),
            self.clip_secs.to_string(),
            "-an".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    async fn record_clip(&self) -> Result<VideoClip> {
        let output_path = scratch_path("storycam_clip", ".mp4");

        let output = Command::new("ffmpeg")
            .args(self.record_args(&output_path))
            .output()
            .await
            .map_err(|e| StorycamError::CaptureFailed {
                message: format!("failed to launch ffmpeg: {e}"),
            })?;

        if !output.status.success() {
            return Err(StorycamError::CaptureFailed {
                message: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    stderr_snippet(&output)
                ),
            });
        }

        if !output_path.exists() {
            return Err(StorycamError::CaptureFailed {
                message: "ffmpeg reported success but wrote no clip".to_string(),
            });
        }

        Ok(VideoClip::new(output_path))
    }
}

/// Extracts clip frames as PNGs via ffmpeg, then loads them from disk.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    fps: f64,
}

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self {
            fps: defaults::EXTRACTION_FPS,
        }
    }

    /// Configure the frame sampling rate
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    fn extract_args(&self, clip: &Path, frame_dir: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            clip.to_string_lossy().into_owned(),
            "-vf".to_string(),
            format!("fps={}", self.fps),
            frame_dir
                .join("frame_%04d.png")
                .to_string_lossy()
                .into_owned(),
        ]
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frames(&self, clip: &VideoClip) -> Result<Vec<Frame>> {
        let frame_dir = scratch_path("storycam_frames", "");
        fs::create_dir_all(&frame_dir).map_err(|e| StorycamError::ExtractionFailed {
            message: format!("failed to create frame directory: {e}"),
        })?;

        let output = Command::new("ffmpeg")
            .args(self.extract_args(&clip.path, &frame_dir))
            .output()
            .await
            .map_err(|e| StorycamError::ExtractionFailed {
                message: format!("failed to launch ffmpeg: {e}"),
            })?;

        if !output.status.success() {
            return Err(StorycamError::ExtractionFailed {
                message: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    stderr_snippet(&output)
                ),
            });
        }

        frames_from_dir(&frame_dir)
    }
}

/// List extracted PNGs in frame order (ffmpeg numbers them sequentially).
fn collect_frame_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| StorycamError::ExtractionFailed {
        message: format!("failed to read frame directory: {e}"),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every extracted frame's bytes, preserving extraction order.
fn frames_from_dir(dir: &Path) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for (ordinal, path) in collect_frame_files(dir)?.into_iter().enumerate() {
        let data = fs::read(&path).map_err(|e| StorycamError::ExtractionFailed {
            message: format!("failed to read frame {}: {e}", path.display()),
        })?;
        frames.push(Frame::new(ordinal, data).with_path(path));
    }
    Ok(frames)
}
