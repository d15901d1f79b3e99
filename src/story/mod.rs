//! Story generation service interface.
//!
//! The remote service accepts a still frame plus prompt context and returns
//! story text with narrated-audio payloads.

pub mod context;
pub mod http;

pub use context::{MockWeather, StaticWeather, WeatherProvider, story_date};
pub use http::HttpStoryService;

use crate::error::{Result, StorycamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A decoded story service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryResponse {
    /// Generated story text.
    #[serde(rename = "story")]
    pub text: String,
    /// Base64-encoded narrated audio, one payload per narration part.
    #[serde(default)]
    pub audio_files: Vec<String>,
    /// Short label for what the service saw in the frame.
    #[serde(default)]
    pub event: String,
    /// Server-side processing time.
    #[serde(default)]
    pub processing_time_ms: u64,
}

/// Trait for story generation services.
///
/// This trait allows swapping implementations (remote HTTP service vs mock).
#[async_trait]
pub trait StoryService: Send + Sync {
    /// Request a narrated story for a frame.
    ///
    /// # Arguments
    /// * `image` - Encoded image bytes of the chosen frame
    /// * `weather` - Weather description used as prompt context
    /// * `date` - Human-readable date used as prompt context
    async fn request_story(&self, image: &[u8], weather: &str, date: &str)
    -> Result<StoryResponse>;
}

/// Arguments captured from the most recent mock request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordedRequest {
    pub image_len: usize,
    pub weather: String,
    pub date: String,
}

/// Mock story service for testing
#[derive(Debug, Default)]
pub struct MockStoryService {
    response: Option<StoryResponse>,
    should_fail: bool,
    error_message: String,
    last_request: Mutex<Option<RecordedRequest>>,
}

impl MockStoryService {
    /// Create a new mock returning an empty story
    pub fn new() -> Self {
        Self {
            response: None,
            should_fail: false,
            error_message: "mock service error".to_string(),
            last_request: Mutex::new(None),
        }
    }

    /// Configure the full response returned
    pub fn with_response(mut self, response: StoryResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Configure story text and audio payloads returned
    pub fn with_story(self, text: &str, audio_files: Vec<String>) -> Self {
        self.with_response(StoryResponse {
            text: text.to_string(),
            audio_files,
            event: String::new(),
            processing_time_ms: 0,
        })
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

    /// Arguments of the most recent request, if any
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last_request.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl StoryService for MockStoryService {
    async fn request_story(
        &self,
        image: &[u8],
        weather: &str,
        date: &str,
    ) -> Result<StoryResponse> {
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(RecordedRequest {
                image_len: image.len(),
                weather: weather.to_string(),
                date: date.to_string(),
            });
        }

        if self.should_fail {
            return Err(StorycamError::ServiceRequestFailed {
                message: self.error_message.clone(),
            });
        }

        Ok(self.response.clone().unwrap_or(StoryResponse {
            text: "mock story".to_string(),
            audio_files: Vec::new(),
            event: String::new(),
            processing_time_ms: 0,
        }))
    }
}
