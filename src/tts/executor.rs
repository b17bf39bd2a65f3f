//! Item executor trait and artifact validation.
//!
//! [`ItemExecutor`] renders one [`WorkItem`] into the audio file named by
//! `item.filename`. The dispatcher depends only on this trait; every TTS
//! provider implements it independently.
//!
//! Whether an attempt *worked* is decided by [`OutputValidator`], not by the
//! executor's return value: an executor that reports success but leaves an
//! empty file behind still counts as failed.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::queue::WorkItem;
use crate::tts::payload::PayloadError;

// ---------------------------------------------------------------------------
// ExecutorError
// ---------------------------------------------------------------------------

/// Why a single item failed to render.
///
/// These never leave the dispatcher; they are logged and recorded as
/// [`ItemStatus::Failed`](crate::queue::ItemStatus::Failed).
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// HTTP transport or connection error.
    #[error("TTS request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("TTS request timed out")]
    Timeout,

    /// The provider answered with an error.
    #[error("TTS service error: {0}")]
    Service(String),

    /// The provider is misconfigured (bad URL, missing voice, …).
    #[error("TTS provider misconfigured: {0}")]
    Config(String),

    /// The returned audio could not be written.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The executor task panicked.
    #[error("executor panicked: {0}")]
    Panicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ExecutorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExecutorError::Timeout
        } else {
            ExecutorError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ItemExecutor trait
// ---------------------------------------------------------------------------

/// Renders one work item.
///
/// Implementors must be `Send + Sync`; the dispatcher shares one executor
/// across every worker of a pass via `Arc<dyn ItemExecutor>`.
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    /// Write the artifact for `item` to `item.filename`.
    async fn process(&self, item: &WorkItem) -> Result<(), ExecutorError>;

    /// Short provider name for logs.
    fn name(&self) -> &str {
        "executor"
    }
}

// Compile-time assertion: Box<dyn ItemExecutor> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ItemExecutor>) {}
};

// ---------------------------------------------------------------------------
// OutputValidator
// ---------------------------------------------------------------------------

/// Decides whether a rendered artifact is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputValidator {
    /// Files shorter than this many bytes are trivial.
    pub min_bytes: u64,
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self { min_bytes: 1 }
    }
}

impl OutputValidator {
    pub fn new(min_bytes: u64) -> Self {
        Self {
            min_bytes: min_bytes.max(1),
        }
    }

    /// `true` when `path` is a regular file of at least `min_bytes`.
    pub fn validate(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.len() >= self.min_bytes,
            Err(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedExecutor  (test-only)
// ---------------------------------------------------------------------------

/// Test double that renders by writing a few bytes, failing on demand.
///
/// Items are addressed by file name. Every attempt is counted, and the peak
/// number of simultaneous `process` calls is tracked so tests can observe the
/// pool bound.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedExecutor {
    /// file name → number of leading attempts that fail (`usize::MAX` = always).
    failures: std::collections::HashMap<String, usize>,
    /// file names whose attempts panic instead of failing.
    panics: std::collections::HashSet<String>,
    attempts: std::sync::Mutex<std::collections::HashMap<String, usize>>,
    in_flight: std::sync::atomic::AtomicUsize,
    peak: std::sync::atomic::AtomicUsize,
    /// Per-attempt delay, to let concurrent attempts overlap.
    pub delay: std::time::Duration,
}

#[cfg(test)]
impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `times` attempts on `file_name` fail.
    pub fn fail(mut self, file_name: &str, times: usize) -> Self {
        self.failures.insert(file_name.to_string(), times);
        self
    }

    /// Every attempt on `file_name` fails.
    pub fn always_fail(self, file_name: &str) -> Self {
        self.fail(file_name, usize::MAX)
    }

    pub fn panic_on(mut self, file_name: &str) -> Self {
        self.panics.insert(file_name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn attempts(&self, file_name: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(file_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().sum()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl ItemExecutor for ScriptedExecutor {
    async fn process(&self, item: &WorkItem) -> Result<(), ExecutorError> {
        use std::sync::atomic::Ordering;

        let name = item
            .filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(name.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(&name) {
            panic!("scripted panic for {name}");
        }
        let failing = self.failures.get(&name).copied().unwrap_or(0);
        if attempt <= failing {
            return Err(ExecutorError::Service(format!("scripted failure #{attempt} for {name}")));
        }
        tokio::fs::write(&item.filename, format!("audio:{}:{}", item.text, attempt)).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
