use crate::error::{Result, StorycamError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// A finite video clip produced by a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoClip {
    /// Location of the encoded clip on disk.
    pub path: PathBuf,
}

impl VideoClip {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Trait for clip recorders.
///
/// This trait allows swapping implementations (real camera capture vs mock).
/// A recorder produces exactly one clip per invocation; the future resolves
/// once with the clip or with an error. Callers bound the wait with their
/// own timeout.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Record one finite clip.
    async fn record_clip(&self) -> Result<VideoClip>;
}

/// Mock recorder for testing
#[derive(Debug, Clone)]
pub struct MockRecorder {
    clip_path: PathBuf,
    should_fail: bool,
    error_message: String,
    delay: Option<Duration>,
    calls: Arc<AtomicU32>,
    active: Arc<AtomicU32>,
    max_active: Arc<AtomicU32>,
}

impl MockRecorder {
    /// Create a new mock recorder with default settings
    pub fn new() -> Self {
        Self {
            clip_path: PathBuf::from("/tmp/mock_clip.mov"),
            should_fail: false,
            error_message: "mock capture error".to_string(),
            delay: None,
            calls: Arc::new(AtomicU32::new(0)),
            active: Arc::new(AtomicU32::new(0)),
            max_active: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Configure the mock to resolve with a specific clip path
    pub fn with_clip(mut self, path: impl Into<PathBuf>) -> Self {
        self.clip_path = path.into();
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

    /// Configure a simulated recording duration
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times record_clip was invoked
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently in-flight recordings observed
    pub fn max_concurrent(&self) -> u32 {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Default for MockRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recorder for MockRecorder {
    async fn record_clip(&self) -> Result<VideoClip> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.should_fail {
            Err(StorycamError::CaptureFailed {
                message: self.error_message.clone(),
            })
        } else {
            Ok(VideoClip::new(self.clip_path.clone()))
        }
    }
}
