//! Remote story service over HTTP.

use crate::config::StoryConfig;
use crate::defaults;
use crate::error::{Result, StorycamError};
use crate::story::{StoryResponse, StoryService};
use async_trait::async_trait;
use reqwest::multipart;
use std::time::Duration;

/// Story service client.
///
/// Sends the frame as a multipart file part named `file`, with `weather`,
/// `length`, `voice` and `date` as query parameters. Non-2xx responses and
/// malformed JSON bodies surface as `ServiceRequestFailed`.
#[derive(Debug, Clone)]
pub struct HttpStoryService {
    client: reqwest::Client,
    endpoint: String,
    length: u32,
    voice: String,
}

impl HttpStoryService {
    /// Create a client with default length, voice and timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_settings(
            endpoint,
            defaults::STORY_LENGTH,
            defaults::STORY_VOICE,
            Duration::from_secs(defaults::SERVICE_TIMEOUT_SECS),
        )
    }

    /// Create a client from configuration.
    pub fn from_config(config: &StoryConfig) -> Result<Self> {
        Self::with_settings(
            config.endpoint.clone(),
            config.length,
            &config.voice,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn with_settings(
        endpoint: impl Into<String>,
        length: u32,
        voice: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorycamError::ServiceRequestFailed {
                message: format!("client construction: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            length,
            voice: voice.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StoryService for HttpStoryService {
    async fn request_story(
        &self,
        image: &[u8],
        weather: &str,
        date: &str,
    ) -> Result<StoryResponse> {
        let part = multipart::Part::bytes(image.to_vec())
            .file_name("frame.png")
            .mime_str("image/png")
            .map_err(|e| StorycamError::ServiceRequestFailed {
                message: format!("multipart body: {e}"),
            })?;
        let form = multipart::Form::new().part("file", part);

        let length = self.length.to_string();
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("weather", weather),
                ("length", length.as_str()),
                ("voice", self.voice.as_str()),
                ("date", date),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorycamError::ServiceRequestFailed {
                message: format!("request: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorycamError::ServiceRequestFailed {
                message: format!("HTTP {status}"),
            });
        }

        response
            .json::<StoryResponse>()
            .await
            .map_err(|e| StorycamError::ServiceRequestFailed {
                message: format!("response decode: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let service = HttpStoryService::new("http://localhost:8000/story").unwrap();
        assert_eq!(service.endpoint(), "http://localhost:8000/story");
        assert_eq!(service.length, 200);
        assert_eq!(service.voice, "af_heart");
    }

    #[test]
    fn test_from_config() {
        let config = StoryConfig {
            endpoint: "https://stories.example.com/generate".to_string(),
            length: 120,
            voice: "bm_daniel".to_string(),
            timeout_secs: 10,
            weather: "clear sky".to_string(),
        };

        let service = HttpStoryService::from_config(&config).unwrap();
        assert_eq!(service.endpoint(), "https://stories.example.com/generate");
        assert_eq!(service.length, 120);
        assert_eq!(service.voice, "bm_daniel");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_service_error() {
        // Reserved TEST-NET address; the connection attempt fails fast
        let service = HttpStoryService::with_settings(
            "http://192.0.2.1:9/story",
            200,
            "af_heart",
            Duration::from_millis(250),
        )
        .unwrap();

        let result = service.request_story(&[0u8; 4], "fog", "1 June 2025").await;
        assert!(matches!(
            result,
            Err(StorycamError::ServiceRequestFailed { .. })
        ));
    }
}
