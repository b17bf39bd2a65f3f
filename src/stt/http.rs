//! [`Recognizer`] backed by an HTTP recognition service.
//!
//! The audio file is uploaded as multipart form data together with the
//! request fields; the service answers with
//! `{"code": 0, "msg": "", "data": [{"start_ms": .., "end_ms": .., "text": ..}]}`.
//! All connection details come from [`RecognitionConfig`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::RecognitionConfig;

use super::engine::{RecognitionRequest, RecognizeError, Recognizer, SubtitleEntry};

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<SubtitleEntry>,
}

impl RecognizeResponse {
    fn into_entries(self) -> Result<Vec<SubtitleEntry>, RecognizeError> {
        if self.code != 0 {
            let msg = if self.msg.is_empty() {
                format!("code {}", self.code)
            } else {
                self.msg
            };
            return Err(RecognizeError::Service(msg));
        }
        Ok(self.data)
    }
}

/// Uploads the prepared wav to `api_url`.
pub struct HttpRecognizer {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRecognizer {
    /// Build from config. The client carries the per-request timeout.
    pub fn from_config(config: &RecognitionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_url: config.api_url.clone(),
        }
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Vec<SubtitleEntry>, RecognizeError> {
        let bytes = tokio::fs::read(&request.audio_path)
            .await
            .map_err(|e| RecognizeError::Audio {
                path: request.audio_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let file_name = request
            .audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".into());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("split_type", request.split_type.clone())
            .text("job_id", request.job_id.clone())
            .text("model", request.model_name.clone())
            .text("language", request.language.clone())
            .text("use_gpu", request.use_gpu.to_string())
            .text("subtitle_mode", request.subtitle_mode.to_string());

        log::debug!(
            "recognizer: uploading {} to {}",
            request.audio_path.display(),
            self.api_url
        );

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| RecognizeError::Parse(e.to_string()))?;

        body.into_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn response_with_zero_code_yields_entries() {
        let json = r#"{"code":0,"data":[{"start_ms":0,"end_ms":1200,"text":"hi"}]}"#;
        let body: RecognizeResponse = serde_json::from_str(json).unwrap();
        let entries = body.into_entries().unwrap();
        assert_eq!(entries, vec![SubtitleEntry::new(0, 1200, "hi")]);
    }

    #[test]
    fn response_with_error_code_is_service_error() {
        let json = r#"{"code":1,"msg":"model not downloaded"}"#;
        let body: RecognizeResponse = serde_json::from_str(json).unwrap();
        let err = body.into_entries().unwrap_err();
        assert!(matches!(err, RecognizeError::Service(m) if m == "model not downloaded"));
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _ = HttpRecognizer::from_config(&RecognitionConfig::default());
    }

    #[tokio::test]
    async fn missing_audio_is_reported_before_any_request() {
        let recognizer = HttpRecognizer::from_config(&RecognitionConfig::default());
        let request = RecognitionRequest {
            recogn_type: "http".into(),
            split_type: "all".into(),
            job_id: "j".into(),
            model_name: "m".into(),
            audio_path: PathBuf::from("/nonexistent/a.wav"),
            language: "en".into(),
            cache_dir: PathBuf::from("/tmp"),
            use_gpu: false,
            subtitle_mode: 0,
        };
        let err = recognizer.recognize(&request).await.unwrap_err();
        assert!(matches!(err, RecognizeError::Audio { .. }));
    }
}
