//! End-to-end dubbing job through the public API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use speech_tasks::config::AppConfig;
use speech_tasks::media::{MediaError, MediaToolchain};
use speech_tasks::notify::{ChannelSink, SignalKind};
use speech_tasks::queue::{VoiceParams, WorkItem};
use speech_tasks::registry::ProviderRegistry;
use speech_tasks::task::{JobOutcome, TextToSpeechRequest, TextToSpeechTask};
use speech_tasks::tts::{decode_audio_payload, encode_audio_payload, ExecutorError, ItemExecutor};
use speech_tasks::TaskError;

/// Media stand-in: transcode copies bytes, everything else is recorded.
#[derive(Default)]
struct CopyingMedia {
    trimmed: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl MediaToolchain for CopyingMedia {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn resample_to_16k_mono(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn trim_trailing_silence(&self, path: &Path) -> Result<(), MediaError> {
        self.trimmed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn play(&self, _path: &Path) -> Result<(), MediaError> {
        Ok(())
    }
}

/// Provider stand-in answering with mp3 data URIs, flaky on chosen lines.
struct FlakyProvider {
    media: Arc<CopyingMedia>,
    flaky: Vec<String>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl FlakyProvider {
    fn attempts(&self, text: &str) -> usize {
        self.attempts.lock().unwrap().get(text).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ItemExecutor for FlakyProvider {
    async fn process(&self, item: &WorkItem) -> Result<(), ExecutorError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(item.text.clone()).or_insert(0);
            *n += 1;
            *n
        };
        if attempt == 1 && self.flaky.contains(&item.text) {
            return Err(ExecutorError::Service("429 Too Many Requests".into()));
        }

        let scratch = tempfile::NamedTempFile::new()?;
        std::fs::write(scratch.path(), format!("{}|{}", item.text, item.voice.rate))?;
        let encoded = encode_audio_payload(scratch.path()).await?.unwrap_or_default();
        let payload = format!("data:audio/mpeg;base64,{encoded}");
        decode_audio_payload(&payload, &item.filename, self.media.as_ref()).await?;
        Ok(())
    }
}

fn items(dir: &Path) -> Vec<WorkItem> {
    (0..6)
        .map(|i| {
            WorkItem::new("narrator", format!("line {i}"), dir.join(format!("{i}.wav"))).with_voice(
                VoiceParams {
                    rate: "10%".into(),
                    ..VoiceParams::default()
                },
            )
        })
        .collect()
}

#[tokio::test]
async fn flaky_lines_are_retried_and_every_line_lands() {
    let dir = tempfile::tempdir().unwrap();
    let media = Arc::new(CopyingMedia::default());
    let provider = Arc::new(FlakyProvider {
        media: media.clone(),
        flaky: vec!["line 1".into(), "line 4".into()],
        attempts: Mutex::new(HashMap::new()),
    });

    let mut config = AppConfig::default();
    config.dubbing.provider = "flaky".into();
    config.dubbing.threads = 4;
    config.dubbing.retry_cooldown_secs = 0;
    config.dubbing.remove_silence = true;

    let mut registry: ProviderRegistry<dyn ItemExecutor> = ProviderRegistry::new();
    registry.register("flaky", provider.clone());

    let (sink, mut signals) = ChannelSink::new();
    let task = TextToSpeechTask::new(&config, Arc::new(registry), media.clone(), Arc::new(sink));

    let request = TextToSpeechRequest::new(items(dir.path()));
    let outcome = task.run(&request, &CancellationToken::new()).await.unwrap();

    let JobOutcome::Completed(report) = outcome else {
        panic!("job was cancelled");
    };
    assert_eq!(report.total, 6);
    assert_eq!(report.failed, 0);
    assert_eq!(report.passes, 2);

    for (i, item) in request.items.iter().enumerate() {
        // The caller's copy keeps the raw rate; the job normalized its own.
        assert_eq!(item.voice.rate, "10%");
        let body = std::fs::read_to_string(&item.filename).unwrap();
        assert_eq!(body, format!("line {i}|+10%"));
        assert!(!dir.path().join(format!("{i}.wav.mp3")).exists());
    }
    assert_eq!(provider.attempts("line 0"), 1);
    assert_eq!(provider.attempts("line 1"), 2);
    assert_eq!(provider.attempts("line 4"), 2);
    assert_eq!(media.trimmed.lock().unwrap().len(), 6);

    let first = signals.recv().await.unwrap();
    assert_eq!(first.kind, SignalKind::Info);
    let last = signals.recv().await.unwrap();
    assert_eq!(last.kind, SignalKind::Succeed);
    assert_eq!(last.text, "6/6");
    assert!(signals.try_recv().is_err());
}

#[tokio::test]
async fn empty_queue_never_starts() {
    let media = Arc::new(CopyingMedia::default());
    let registry: ProviderRegistry<dyn ItemExecutor> = ProviderRegistry::new();
    let (sink, mut signals) = ChannelSink::new();
    let task = TextToSpeechTask::new(&AppConfig::default(), Arc::new(registry), media, Arc::new(sink));

    let err = task
        .run(&TextToSpeechRequest::new(Vec::new()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::EmptyJob));
    assert_eq!(signals.recv().await.unwrap().kind, SignalKind::Error);
}
