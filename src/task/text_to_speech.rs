//! Text-to-speech batch job: many lines in, one audio file per line out.
//!
//! # Job flow
//!
//! ```text
//! Prepare     build WorkQueue (EmptyJob if no lines), resolve executor,
//!             concurrency = dubbing.threads, or 1 for a single line
//! Process     RetryController::run  (TotalFailure / ExcessiveFailure)
//! Finalize    play mode  → first artifact must be valid, start playback
//!             otherwise → trim trailing silence if enabled
//! ```
//!
//! There is no input to wait for, so `AwaitInput` is passed straight through.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, DubbingConfig};
use crate::error::TaskError;
use crate::media::MediaToolchain;
use crate::notify::{SharedSink, Signal};
use crate::queue::{WorkItem, WorkQueue};
use crate::registry::ProviderRegistry;
use crate::tts::{
    Dispatcher, ItemExecutor, JobState, OutputValidator, RetryController, RetryOutcome, RetryReport,
};

use super::phase::{JobOutcome, JobPhase};
use super::report_failure;

const JOB: &str = "dubbing";

/// One dubbing job.
#[derive(Debug, Clone, PartialEq)]
pub struct TextToSpeechRequest {
    pub items: Vec<WorkItem>,
    /// Play the first line once rendered instead of post-processing the batch.
    pub play: bool,
}

impl TextToSpeechRequest {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items, play: false }
    }

    pub fn play(mut self, play: bool) -> Self {
        self.play = play;
        self
    }
}

/// Runs dubbing jobs against an executor registry.
pub struct TextToSpeechTask {
    config: DubbingConfig,
    zh: bool,
    executors: Arc<ProviderRegistry<dyn ItemExecutor>>,
    media: Arc<dyn MediaToolchain>,
    sink: SharedSink,
}

impl TextToSpeechTask {
    pub fn new(
        config: &AppConfig,
        executors: Arc<ProviderRegistry<dyn ItemExecutor>>,
        media: Arc<dyn MediaToolchain>,
        sink: SharedSink,
    ) -> Self {
        Self {
            config: config.dubbing.clone(),
            zh: config.is_zh(),
            executors,
            media,
            sink,
        }
    }

    /// Worker count for a job of `len` items.
    pub fn concurrency_for(&self, len: usize) -> usize {
        if len > 1 {
            self.config.threads.max(1)
        } else {
            1
        }
    }

    /// Run one job to completion.
    ///
    /// The caller's items are copied into the job; their `filename`s receive
    /// the rendered audio.
    pub async fn run(
        &self,
        request: &TextToSpeechRequest,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome<RetryReport>, TaskError> {
        self.execute(request, cancel)
            .await
            .map_err(|e| report_failure(JOB, &self.sink, e))
    }

    async fn execute(
        &self,
        request: &TextToSpeechRequest,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome<RetryReport>, TaskError> {
        if !JobPhase::Prepare.enter(JOB, cancel) {
            return Ok(JobOutcome::Cancelled);
        }
        let mut queue = WorkQueue::new(&request.items)?;
        let executor = self.executors.resolve(&self.config.provider)?;
        let validator = OutputValidator::new(self.config.min_output_bytes);
        let state = Arc::new(JobState::new(self.concurrency_for(queue.len())));
        log::info!(
            "{JOB}: {} line(s) via `{}`, {} worker(s)",
            queue.len(),
            executor.name(),
            state.concurrency()
        );

        let controller = RetryController::new(Dispatcher::new(executor), validator, self.sink.clone())
            .with_cooldown(Duration::from_secs(self.config.retry_cooldown_secs))
            .with_retry_message(if self.zh {
                "存在失败配音，尝试重试"
            } else {
                "Failed dubbing exists, try retrying"
            });

        if !JobPhase::AwaitInput.enter(JOB, cancel) || !JobPhase::Process.enter(JOB, cancel) {
            return Ok(JobOutcome::Cancelled);
        }
        let report = match controller.run(&mut queue, &state, cancel).await? {
            RetryOutcome::Finished(report) => report,
            RetryOutcome::Cancelled => return Ok(JobOutcome::Cancelled),
        };

        if !JobPhase::Finalize.enter(JOB, cancel) {
            return Ok(JobOutcome::Cancelled);
        }
        if request.play {
            let first = queue.get(0).map(|item| item.filename.clone()).unwrap_or_default();
            if !validator.validate(&first) {
                let reason = state.last_error().unwrap_or_else(|| first.display().to_string());
                return Err(TaskError::Playback(if self.zh {
                    format!("配音出错: {reason}")
                } else {
                    format!("Dubbing occur error: {reason}")
                }));
            }
            log::info!("{JOB}: playing {}", first.display());
            self.media.play(&first).await?;
            self.sink.emit(Signal::succeed(first.display().to_string()));
            return Ok(JobOutcome::Completed(report));
        }

        if self.config.remove_silence {
            for path in queue.filenames() {
                if !validator.validate(path) {
                    continue;
                }
                if let Err(e) = self.media.trim_trailing_silence(path).await {
                    log::warn!("{JOB}: silence trim failed for {}: {e}", path.display());
                }
            }
        }

        log::info!(
            "{JOB}: finished {} line(s), {} missing, {} pass(es)",
            report.total,
            report.failed,
            report.passes
        );
        self.sink.emit(Signal::succeed(format!(
            "{}/{}",
            report.total - report.failed,
            report.total
        )));
        Ok(JobOutcome::Completed(report))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::media::{MediaCall, MockToolchain};
    use crate::notify::{RecordingSink, SignalKind};
    use crate::tts::ScriptedExecutor;

    struct Fixture {
        dir: tempfile::TempDir,
        exec: Arc<ScriptedExecutor>,
        media: Arc<MockToolchain>,
        sink: Arc<RecordingSink>,
        task: TextToSpeechTask,
    }

    fn fixture(exec: ScriptedExecutor, tweak: impl FnOnce(&mut AppConfig)) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.dubbing.provider = "scripted".into();
        config.dubbing.threads = 3;
        config.dubbing.retry_cooldown_secs = 0;
        tweak(&mut config);

        let exec = Arc::new(exec);
        let mut registry: ProviderRegistry<dyn ItemExecutor> = ProviderRegistry::new();
        registry.register("scripted", exec.clone());

        let media = Arc::new(MockToolchain::default());
        let sink = Arc::new(RecordingSink::default());
        let task = TextToSpeechTask::new(&config, Arc::new(registry), media.clone(), sink.clone());
        Fixture {
            dir,
            exec,
            media,
            sink,
            task,
        }
    }

    fn lines(dir: &Path, n: usize) -> Vec<WorkItem> {
        (0..n)
            .map(|i| WorkItem::new("voice", format!("line {i}"), dir.join(format!("{i}.wav"))))
            .collect()
    }

    fn trimmed(media: &MockToolchain) -> Vec<PathBuf> {
        media
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MediaCall::Trim(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn concurrency_is_one_for_a_single_line() {
        let f = fixture(ScriptedExecutor::new(), |_| {});
        assert_eq!(f.task.concurrency_for(1), 1);
        assert_eq!(f.task.concurrency_for(2), 3);
    }

    #[tokio::test]
    async fn empty_job_is_rejected_and_signalled() {
        let f = fixture(ScriptedExecutor::new(), |_| {});
        let err = f
            .task
            .run(&TextToSpeechRequest::new(Vec::new()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::EmptyJob));
        assert_eq!(f.sink.kinds(), vec![SignalKind::Error]);
        assert_eq!(f.exec.total_attempts(), 0);
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let f = fixture(ScriptedExecutor::new(), |c| c.dubbing.provider = "azure".into());
        let err = f
            .task
            .run(&TextToSpeechRequest::new(lines(f.dir.path(), 2)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::UnknownProvider(tag) if tag == "azure"));
    }

    #[tokio::test]
    async fn batch_renders_every_line_without_touching_caller_items() {
        let f = fixture(ScriptedExecutor::new(), |_| {});
        let request = TextToSpeechRequest::new(lines(f.dir.path(), 5));
        let before = request.clone();

        let report = f
            .task
            .run(&request, &CancellationToken::new())
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(request, before);
        for item in &request.items {
            assert!(item.filename.exists());
        }
        assert!(trimmed(&f.media).is_empty(), "silence trim is off by default");
        assert_eq!(f.sink.kinds(), vec![SignalKind::Succeed]);
        assert_eq!(f.sink.signals()[0].text, "5/5");
    }

    #[tokio::test]
    async fn silence_is_trimmed_from_valid_artifacts_only() {
        let f = fixture(ScriptedExecutor::new().always_fail("2.wav"), |c| {
            c.dubbing.remove_silence = true;
        });
        let items = lines(f.dir.path(), 6);

        f.task
            .run(&TextToSpeechRequest::new(items.clone()), &CancellationToken::new())
            .await
            .unwrap();

        let trimmed = trimmed(&f.media);
        assert_eq!(trimmed.len(), 5);
        assert!(!trimmed.contains(&items[2].filename));
        assert_eq!(f.sink.kinds(), vec![SignalKind::Info, SignalKind::Succeed]);
    }

    #[tokio::test]
    async fn failed_trim_is_not_fatal() {
        let mut f = fixture(ScriptedExecutor::new(), |c| c.dubbing.remove_silence = true);
        let media = Arc::new(MockToolchain::failing_trim());
        f.task.media = media.clone() as Arc<dyn MediaToolchain>;

        let report = f
            .task
            .run(&TextToSpeechRequest::new(lines(f.dir.path(), 3)), &CancellationToken::new())
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(trimmed(&media).len(), 3, "every artifact is still attempted");
        assert_eq!(f.sink.kinds(), vec![SignalKind::Succeed]);
    }

    #[tokio::test]
    async fn excessive_failure_is_signalled_and_returned() {
        let f = fixture(
            ScriptedExecutor::new().always_fail("0.wav").always_fail("1.wav"),
            |_| {},
        );
        let err = f
            .task
            .run(&TextToSpeechRequest::new(lines(f.dir.path(), 5)), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TaskError::ExcessiveFailure { failed: 2, total: 5, .. }));
        assert_eq!(f.sink.kinds(), vec![SignalKind::Info, SignalKind::Error]);
    }

    #[tokio::test]
    async fn play_mode_starts_playback_of_first_line() {
        let f = fixture(ScriptedExecutor::new(), |c| c.dubbing.remove_silence = true);
        let items = lines(f.dir.path(), 1);

        f.task
            .run(&TextToSpeechRequest::new(items.clone()).play(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(f.media.calls(), vec![MediaCall::Play(items[0].filename.clone())]);
        assert_eq!(f.sink.kinds(), vec![SignalKind::Succeed]);
    }

    #[tokio::test]
    async fn play_mode_with_failed_line_is_an_error() {
        let f = fixture(ScriptedExecutor::new().always_fail("0.wav"), |_| {});
        let err = f
            .task
            .run(
                &TextToSpeechRequest::new(lines(f.dir.path(), 1)).play(true),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        // A single failed line is already a total failure.
        assert!(matches!(err, TaskError::TotalFailure { total: 1, .. }));
        assert!(f.media.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_job_renders_nothing() {
        let f = fixture(ScriptedExecutor::new(), |_| {});
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = f
            .task
            .run(&TextToSpeechRequest::new(lines(f.dir.path(), 3)), &cancel)
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(f.exec.total_attempts(), 0);
        assert!(f.sink.signals().is_empty());
    }
}
