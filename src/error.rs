//! Error types for storycam.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorycamError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Capture errors
    #[error("Recording failed: {message}")]
    CaptureFailed { message: String },

    #[error("Recording timed out after {secs}s")]
    CaptureTimeout { secs: u64 },

    #[error("Frame extraction failed: {message}")]
    ExtractionFailed { message: String },

    // Frame scoring errors
    #[error("Frame scoring failed: {message}")]
    ScoringFailed { message: String },

    // Story service errors
    #[error("Story request failed: {message}")]
    ServiceRequestFailed { message: String },

    // Playback errors
    #[error("Audio payload decode failed: {message}")]
    AudioDecodeFailed { message: String },

    #[error("Playback failed: {message}")]
    PlaybackFailed { message: String },

    // Queue navigation signals (edge cases, not faults)
    #[error("Queue exhausted")]
    QueueExhausted,

    #[error("No previous item in queue")]
    NoPreviousItem,

    #[error("Queue index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, StorycamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = StorycamError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_capture_failed_display() {
        let error = StorycamError::CaptureFailed {
            message: "camera busy".to_string(),
        };
        assert_eq!(error.to_string(), "Recording failed: camera busy");
    }

    #[test]
    fn test_capture_timeout_display() {
        let error = StorycamError::CaptureTimeout { secs: 30 };
        assert_eq!(error.to_string(), "Recording timed out after 30s");
    }

    #[test]
    fn test_extraction_failed_display() {
        let error = StorycamError::ExtractionFailed {
            message: "no video track".to_string(),
        };
        assert_eq!(error.to_string(), "Frame extraction failed: no video track");
    }

    #[test]
    fn test_scoring_failed_display() {
        let error = StorycamError::ScoringFailed {
            message: "image decode: truncated".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Frame scoring failed: image decode: truncated"
        );
    }

    #[test]
    fn test_service_request_failed_display() {
        let error = StorycamError::ServiceRequestFailed {
            message: "HTTP 500 Internal Server Error".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Story request failed: HTTP 500 Internal Server Error"
        );
    }

    #[test]
    fn test_audio_decode_failed_display() {
        let error = StorycamError::AudioDecodeFailed {
            message: "not a WAV header".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio payload decode failed: not a WAV header"
        );
    }

    #[test]
    fn test_playback_failed_display() {
        let error = StorycamError::PlaybackFailed {
            message: "device unavailable".to_string(),
        };
        assert_eq!(error.to_string(), "Playback failed: device unavailable");
    }

    #[test]
    fn test_queue_navigation_displays() {
        assert_eq!(StorycamError::QueueExhausted.to_string(), "Queue exhausted");
        assert_eq!(
            StorycamError::NoPreviousItem.to_string(),
            "No previous item in queue"
        );
        assert_eq!(
            StorycamError::IndexOutOfRange { index: 5, len: 3 }.to_string(),
            "Queue index 5 out of range (length 3)"
        );
    }

    #[test]
    fn test_other_display() {
        let error = StorycamError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: StorycamError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: StorycamError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<StorycamError>();
        assert_sync::<StorycamError>();
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: StorycamError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }
}
