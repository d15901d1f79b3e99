use crate::capture::recorder::VideoClip;
use crate::error::{Result, StorycamError};
use async_trait::async_trait;
use std::path::PathBuf;

/// A still frame lifted out of a recorded clip.
///
/// `data` holds the encoded image bytes (PNG); frames are owned by the cycle
/// that extracted them and all but the chosen one are discarded once
/// selection finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position of the frame within the clip's extraction order.
    pub ordinal: usize,
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// On-disk location, when the extractor materialized one.
    pub path: Option<PathBuf>,
}

impl Frame {
    pub fn new(ordinal: usize, data: Vec<u8>) -> Self {
        Self {
            ordinal,
            data,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Trait for frame extractors.
///
/// This trait allows swapping implementations (real ffmpeg extraction vs mock).
/// May legitimately produce zero frames; callers decide whether that ends the
/// cycle.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract still frames from a clip, in clip order.
    async fn extract_frames(&self, clip: &VideoClip) -> Result<Vec<Frame>>;
}

/// Mock frame extractor for testing
#[derive(Debug, Clone, Default)]
pub struct MockFrameExtractor {
    frames: Vec<Vec<u8>>,
    should_fail: bool,
    error_message: String,
}

impl MockFrameExtractor {
    /// Create a new mock extractor producing no frames
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            should_fail: false,
            error_message: "mock extraction error".to_string(),
        }
    }

    /// Configure the frame payloads returned, in order
    pub fn with_frames(mut self, frames: Vec<Vec<u8>>) -> Self {
        self.frames = frames;
        self
    }

    /// Configure the mock to fail
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }
}

#[async_trait]
impl FrameExtractor for MockFrameExtractor {
    async fn extract_frames(&self, _clip: &VideoClip) -> Result<Vec<Frame>> {
        if self.should_fail {
            return Err(StorycamError::ExtractionFailed {
                message: self.error_message.clone(),
            });
        }
        Ok(self
            .frames
            .iter()
            .enumerate()
            .map(|(ordinal, data)| Frame::new(ordinal, data.clone()))
            .collect())
    }
}
