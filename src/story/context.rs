//! Prompt context: weather description and date string.
//!
//! The actual location/weather lookup is outside this crate; the pipeline
//! only needs a short textual description, so the seam is a provider trait
//! with a static default.

use crate::error::{Result, StorycamError};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trait for weather description providers.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// A short human-readable description of current conditions.
    async fn describe(&self) -> Result<String>;
}

/// Provider that always returns a fixed description.
#[derive(Debug, Clone)]
pub struct StaticWeather {
    description: String,
}

impl StaticWeather {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn describe(&self) -> Result<String> {
        Ok(self.description.clone())
    }
}

/// Mock weather provider for testing
#[derive(Debug, Clone)]
pub struct MockWeather {
    description: String,
    should_fail: bool,
}

impl MockWeather {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            should_fail: false,
        }
    }

    /// Configure the mock to fail
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl WeatherProvider for MockWeather {
    async fn describe(&self) -> Result<String> {
        if self.should_fail {
            Err(StorycamError::Other("mock weather failure".to_string()))
        } else {
            Ok(self.description.clone())
        }
    }
}

/// Today's date formatted for the story prompt.
pub fn story_date() -> String {
    format_story_date(chrono::Local::now().date_naive())
}

/// Format a date the way the story prompt expects: "7 August 2026".
pub fn format_story_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}
