//! Speech-to-text job: one media file in, one `.srt` out.
//!
//! # Job flow
//!
//! ```text
//! Prepare     resolve recognizer, mkdir target + cache,
//!             resample source → <cache>/<stem>-<millis>.wav
//! AwaitInput  poll until the wav exists (cancellable)
//! Process     recognizer.recognize(..), remove wav; empty → EmptyResult
//! Finalize    write <target>/<stem>.srt, signal succeed,
//!             delete source if asked
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, RecognitionConfig};
use crate::error::TaskError;
use crate::media::MediaToolchain;
use crate::notify::{SharedSink, Signal};
use crate::registry::ProviderRegistry;
use crate::stt::{RecognitionRequest, Recognizer};
use crate::subtitle::{SrtWriter, SubtitleWriter};

use super::phase::{JobOutcome, JobPhase};
use super::report_failure;

const JOB: &str = "speech2text";

/// Default wait between checks for the converted audio.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One recognition job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechToTextRequest {
    /// Audio or video file to transcribe.
    pub source: PathBuf,
    /// Where the subtitle goes; `<home>/recogn` when `None`.
    pub target_dir: Option<PathBuf>,
    /// Overrides `recognition.language`.
    pub language: Option<String>,
    /// Overrides `recognition.delete_source`.
    pub delete_source: Option<bool>,
}

impl SpeechToTextRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target_dir: None,
            language: None,
            delete_source: None,
        }
    }

    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn delete_source(mut self, delete: bool) -> Self {
        self.delete_source = Some(delete);
        self
    }
}

/// Resolved file locations for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechToTextPlan {
    pub target_dir: PathBuf,
    /// `<target_dir>/<stem>.srt`
    pub subtitle: PathBuf,
    pub cache_dir: PathBuf,
    /// `<cache_dir>/<stem>-<unix millis>.wav`
    pub intermediate: PathBuf,
    pub job_id: String,
}

/// Runs recognition jobs against a recognizer registry.
pub struct SpeechToTextTask {
    config: RecognitionConfig,
    home_dir: PathBuf,
    temp_dir: PathBuf,
    zh: bool,
    recognizers: Arc<ProviderRegistry<dyn Recognizer>>,
    media: Arc<dyn MediaToolchain>,
    writer: Arc<dyn SubtitleWriter>,
    sink: SharedSink,
    poll_interval: Duration,
}

impl SpeechToTextTask {
    pub fn new(
        config: &AppConfig,
        recognizers: Arc<ProviderRegistry<dyn Recognizer>>,
        media: Arc<dyn MediaToolchain>,
        sink: SharedSink,
    ) -> Self {
        Self {
            config: config.recognition.clone(),
            home_dir: config.paths.home_dir.clone(),
            temp_dir: config.paths.temp_dir.clone(),
            zh: config.is_zh(),
            recognizers,
            media,
            writer: Arc::new(SrtWriter),
            sink,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn SubtitleWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Work out where everything for `request` lives.
    pub fn plan(&self, request: &SpeechToTextRequest) -> Result<SpeechToTextPlan, TaskError> {
        let stem = request
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TaskError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("source has no file name: {}", request.source.display()),
                ))
            })?;

        let target_dir = request
            .target_dir
            .clone()
            .unwrap_or_else(|| self.home_dir.join("recogn"));
        let cache_dir = self.temp_dir.join("speech2text");
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Ok(SpeechToTextPlan {
            subtitle: target_dir.join(format!("{stem}.srt")),
            intermediate: cache_dir.join(format!("{stem}-{millis}.wav")),
            job_id: format!("{stem}-{millis}"),
            target_dir,
            cache_dir,
        })
    }

    /// Run one job to completion.
    ///
    /// Returns the subtitle path on success, or [`JobOutcome::Cancelled`] if
    /// `cancel` fired at a phase boundary.
    pub async fn run(
        &self,
        request: &SpeechToTextRequest,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome<PathBuf>, TaskError> {
        self.execute(request, cancel)
            .await
            .map_err(|e| report_failure(JOB, &self.sink, e))
    }

    async fn execute(
        &self,
        request: &SpeechToTextRequest,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome<PathBuf>, TaskError> {
        let recognizer = self.recognizers.resolve(&self.config.recogn_type)?;
        let plan = self.plan(request)?;
        let language = request
            .language
            .clone()
            .unwrap_or_else(|| self.config.language.clone());

        tokio::fs::create_dir_all(&plan.target_dir).await?;
        tokio::fs::create_dir_all(&plan.cache_dir).await?;
        self.sink.emit(Signal::info(if self.zh {
            "语音识别文字处理中"
        } else {
            "Speech Recognition to Word Processing"
        }));

        if !JobPhase::Prepare.enter(JOB, cancel) {
            return Ok(JobOutcome::Cancelled);
        }
        log::info!(
            "{JOB}: converting {} → {}",
            request.source.display(),
            plan.intermediate.display()
        );
        self.media
            .resample_to_16k_mono(&request.source, &plan.intermediate)
            .await?;

        if !JobPhase::AwaitInput.enter(JOB, cancel) {
            return Ok(JobOutcome::Cancelled);
        }
        if !self.wait_for(&plan.intermediate, cancel).await {
            log::info!("{JOB}: cancelled while waiting for {}", plan.intermediate.display());
            remove_if_present(&plan.intermediate).await;
            return Ok(JobOutcome::Cancelled);
        }

        if !JobPhase::Process.enter(JOB, cancel) {
            remove_if_present(&plan.intermediate).await;
            return Ok(JobOutcome::Cancelled);
        }
        let recognition = RecognitionRequest {
            recogn_type: self.config.recogn_type.clone(),
            split_type: self.config.split_type.clone(),
            job_id: plan.job_id.clone(),
            model_name: self.config.model_name.clone(),
            audio_path: plan.intermediate.clone(),
            language: language.clone(),
            cache_dir: plan.cache_dir.clone(),
            use_gpu: self.config.use_gpu,
            subtitle_mode: 0,
        };
        // The wav is only input to the recognizer; drop it whatever the result.
        let recognized = recognizer.recognize(&recognition).await;
        remove_if_present(&plan.intermediate).await;
        let entries = recognized?;
        if cancel.is_cancelled() {
            log::info!("{JOB}: cancelled after recognition, discarding result");
            return Ok(JobOutcome::Cancelled);
        }
        if entries.is_empty() {
            return Err(TaskError::EmptyResult {
                source_name: file_name(&request.source),
                language,
            });
        }
        log::info!("{JOB}: recognized {} line(s)", entries.len());
        self.writer.write(&entries, &plan.subtitle).await?;

        if !JobPhase::Finalize.enter(JOB, cancel) {
            return Ok(JobOutcome::Cancelled);
        }
        self.sink.emit(Signal::succeed(request.source.display().to_string()));
        if request.delete_source.unwrap_or(self.config.delete_source) {
            log::info!("{JOB}: deleting source {}", request.source.display());
            remove_if_present(&request.source).await;
        }

        Ok(JobOutcome::Completed(plan.subtitle))
    }

    /// Poll until `path` exists. `false` if cancelled first.
    async fn wait_for(&self, path: &Path, cancel: &CancellationToken) -> bool {
        loop {
            if path.exists() {
                return true;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Remove `path`; a missing file is fine.
async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("{JOB}: could not remove {}: {e}", path.display()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
