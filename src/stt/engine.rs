//! Core recognizer trait and request/response types.
//!
//! # Overview
//!
//! [`Recognizer`] is the interface the speech-to-text task uses. It is
//! object-safe and `Send + Sync` so providers can sit in a
//! [`ProviderRegistry`](crate::registry::ProviderRegistry) behind
//! `Arc<dyn Recognizer>`.
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) returns a
//! pre-configured response without touching any backend.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// RecognizeError
// ---------------------------------------------------------------------------

/// All errors that can arise from a recognizer.
#[derive(Debug, Clone, Error)]
pub enum RecognizeError {
    /// HTTP transport or connection error.
    #[error("recognition request failed: {0}")]
    Request(String),

    /// The recognizer answered but reported a failure.
    #[error("recognizer error: {0}")]
    Service(String),

    /// The response could not be parsed.
    #[error("failed to parse recognition response: {0}")]
    Parse(String),

    /// The audio file handed to the recognizer could not be read.
    #[error("cannot read audio {path}: {reason}")]
    Audio { path: String, reason: String },
}

impl From<reqwest::Error> for RecognizeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RecognizeError::Parse(e.to_string())
        } else {
            RecognizeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Everything a recognizer needs for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionRequest {
    /// Registry tag the recognizer was resolved from.
    pub recogn_type: String,
    /// Whole-file vs. equal-split recognition.
    pub split_type: String,
    /// Job identifier, for provider-side logging and cancellation.
    pub job_id: String,
    pub model_name: String,
    /// 16 kHz mono wav prepared by the task.
    pub audio_path: PathBuf,
    /// Spoken language, or `"auto"`.
    pub language: String,
    /// Scratch directory the provider may use.
    pub cache_dir: PathBuf,
    pub use_gpu: bool,
    /// Subtitle layout requested from the provider (0 = single language).
    pub subtitle_mode: u8,
}

/// One recognized, time-aligned line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    /// Start offset in milliseconds.
    pub start_ms: u64,
    /// End offset in milliseconds.
    pub end_ms: u64,
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech recognition providers.
///
/// Returns entries in playback order. An empty vector is a legal return
/// value here; the task decides that it is a failure.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Vec<SubtitleEntry>, RecognizeError>;
}

// Compile-time assertion: Box<dyn Recognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recognizer>) {}
};

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response and remembers the
/// last request it saw.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<Vec<SubtitleEntry>, RecognizeError>,
    last_request: std::sync::Mutex<Option<RecognitionRequest>>,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn ok(entries: Vec<SubtitleEntry>) -> Self {
        Self {
            response: Ok(entries),
            last_request: std::sync::Mutex::new(None),
        }
    }

    pub fn err(error: RecognizeError) -> Self {
        Self {
            response: Err(error),
            last_request: std::sync::Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<RecognitionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Recognizer for MockRecognizer {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Vec<SubtitleEntry>, RecognizeError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RecognitionRequest {
        RecognitionRequest {
            recogn_type: "mock".into(),
            split_type: "all".into(),
            job_id: "job-1".into(),
            model_name: "tiny".into(),
            audio_path: PathBuf::from("/tmp/a.wav"),
            language: "en".into(),
            cache_dir: PathBuf::from("/tmp"),
            use_gpu: false,
            subtitle_mode: 0,
        }
    }

    #[tokio::test]
    async fn mock_ok_returns_entries_and_records_request() {
        let mock = MockRecognizer::ok(vec![SubtitleEntry::new(0, 900, "hello")]);
        let entries = mock.recognize(&request()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(mock.last_request().unwrap().job_id, "job-1");
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let mock = MockRecognizer::err(RecognizeError::Service("model missing".into()));
        let err = mock.recognize(&request()).await.unwrap_err();
        assert!(matches!(err, RecognizeError::Service(_)));
    }

    #[test]
    fn error_display_carries_detail() {
        let e = RecognizeError::Audio {
            path: "/tmp/a.wav".into(),
            reason: "no such file".into(),
        };
        assert!(e.to_string().contains("/tmp/a.wav"));
    }
}
