//! [`ItemExecutor`] backed by an HTTP TTS service.
//!
//! Each item is posted as JSON:
//!
//! ```json
//! {"text": "...", "role": "...", "rate": "+0%", "volume": "+0%",
//!  "pitch": "+0Hz", "language": "en", ...provider extras}
//! ```
//!
//! and the service answers `{"code": 0, "msg": "", "data": "<base64 audio>"}`.
//! `data` may be raw base64 or a `data:audio/...` URI; it is decoded through
//! [`decode_audio_payload`] into `item.filename`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::DubbingConfig;
use crate::media::MediaToolchain;
use crate::queue::WorkItem;

use super::executor::{ExecutorError, ItemExecutor};
use super::payload::decode_audio_payload;

/// Shortest `api_url` that can plausibly name an endpoint (`http://a.b`).
const MIN_URL_LEN: usize = 10;

#[derive(Debug, Deserialize)]
struct TtsResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: String,
}

impl TtsResponse {
    fn into_payload(self) -> Result<String, ExecutorError> {
        if self.code != 0 {
            let msg = if self.msg.is_empty() {
                format!("code {}", self.code)
            } else {
                self.msg
            };
            return Err(ExecutorError::Service(msg));
        }
        Ok(self.data)
    }
}

/// Posts each line to `api_url` and writes the returned audio.
pub struct HttpTtsExecutor {
    client: reqwest::Client,
    api_url: String,
    language: String,
    media: Arc<dyn MediaToolchain>,
}

impl HttpTtsExecutor {
    /// Build from config.
    ///
    /// Returns [`ExecutorError::Config`] when `api_url` is missing or too
    /// short to be a URL.
    pub fn from_config(
        config: &DubbingConfig,
        language: impl Into<String>,
        media: Arc<dyn MediaToolchain>,
    ) -> Result<Self, ExecutorError> {
        let api_url = config.api_url.trim();
        if api_url.len() < MIN_URL_LEN {
            return Err(ExecutorError::Config(format!(
                "TTS api_url `{api_url}` is not a valid endpoint"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            language: language.into(),
            media,
        })
    }

    /// JSON body for `item`.
    fn request_body(&self, item: &WorkItem) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        // Extras first so the well-known fields always win.
        for (key, value) in &item.extra {
            body.insert(key.clone(), value.clone());
        }
        body.insert("text".into(), item.text.clone().into());
        body.insert("role".into(), item.role.clone().into());
        body.insert("rate".into(), item.voice.rate.clone().into());
        body.insert("volume".into(), item.voice.volume.clone().into());
        body.insert("pitch".into(), item.voice.pitch.clone().into());
        body.insert("language".into(), self.language.clone().into());
        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl ItemExecutor for HttpTtsExecutor {
    async fn process(&self, item: &WorkItem) -> Result<(), ExecutorError> {
        if item.text.trim().is_empty() {
            return Err(ExecutorError::Config("empty text".into()));
        }

        log::debug!(
            "tts: requesting {} ({} chars) from {}",
            item.filename.display(),
            item.text.chars().count(),
            self.api_url
        );

        let response = self
            .client
            .post(&self.api_url)
            .json(&self.request_body(item))
            .send()
            .await?
            .error_for_status()?;

        let body: TtsResponse = response.json().await?;
        let payload = body.into_payload()?;

        decode_audio_payload(&payload, &item.filename, self.media.as_ref()).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockToolchain;
    use crate::queue::VoiceParams;

    fn config(url: &str) -> DubbingConfig {
        DubbingConfig {
            api_url: url.into(),
            ..DubbingConfig::default()
        }
    }

    fn executor() -> HttpTtsExecutor {
        HttpTtsExecutor::from_config(
            &config("http://127.0.0.1:9880/tts"),
            "en",
            Arc::new(MockToolchain::default()),
        )
        .unwrap()
    }

    #[test]
    fn short_url_is_a_config_error() {
        let result = HttpTtsExecutor::from_config(&config("http://"), "en", Arc::new(MockToolchain::default()));
        assert!(matches!(result, Err(ExecutorError::Config(_))));
    }

    #[test]
    fn body_carries_voice_language_and_extras() {
        let mut item = WorkItem::new("alice", "hello", "/tmp/0.wav").with_voice(VoiceParams {
            rate: "+10%".into(),
            volume: "-5%".into(),
            pitch: "+2Hz".into(),
        });
        item.extra.insert("speed".into(), serde_json::json!(1.2));
        item.extra.insert("text".into(), serde_json::json!("ignored"));

        let body = executor().request_body(&item);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["role"], "alice");
        assert_eq!(body["rate"], "+10%");
        assert_eq!(body["volume"], "-5%");
        assert_eq!(body["pitch"], "+2Hz");
        assert_eq!(body["language"], "en");
        assert_eq!(body["speed"], 1.2);
        assert!(body.get("filename").is_none());
    }

    #[test]
    fn nonzero_code_is_a_service_error() {
        let body: TtsResponse = serde_json::from_str(r#"{"code":1,"msg":"voice not found"}"#).unwrap();
        match body.into_payload() {
            Err(ExecutorError::Service(msg)) => assert_eq!(msg, "voice not found"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn zero_code_yields_data() {
        let body: TtsResponse = serde_json::from_str(r#"{"code":0,"data":"UklGRg=="}"#).unwrap();
        assert_eq!(body.into_payload().unwrap(), "UklGRg==");
    }

    #[tokio::test]
    async fn empty_text_fails_without_a_request() {
        let item = WorkItem::new("alice", "   ", "/tmp/0.wav");
        let err = executor().process(&item).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Config(_)));
    }
}
