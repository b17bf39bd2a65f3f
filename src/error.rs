//! Job-level error taxonomy.
//!
//! Only conditions that end a job live here. A single item failing to render
//! is not an error at this level: it shows up as a missing or invalid
//! artifact and is handled by the retry controller.

use thiserror::Error;

use crate::media::MediaError;
use crate::stt::RecognizeError;
use crate::tts::PayloadError;

/// Errors that end a speech-to-text or text-to-speech job.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The caller supplied zero work items; the job never starts.
    #[error("no work items supplied")]
    EmptyJob,

    /// An encoded audio payload could not be turned into an artifact.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Recognition finished but produced no subtitle entries.
    #[error("{source_name}: recognition result is empty (language: {language})")]
    EmptyResult {
        source_name: String,
        language: String,
    },

    /// More than a third of the items still failed after the retry pass.
    #[error("dubbing failed for {failed} of {total} lines (more than 1/3){}", fmt_reason(.last_error))]
    ExcessiveFailure {
        failed: usize,
        total: usize,
        last_error: Option<String>,
    },

    /// Every item failed on a pass; no retry was attempted.
    #[error("dubbing failed for all {total} lines{}", fmt_reason(.last_error))]
    TotalFailure {
        total: usize,
        last_error: Option<String>,
    },

    /// No provider is registered under the configured tag.
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),

    /// The recognizer raised.
    #[error(transparent)]
    Recognition(#[from] RecognizeError),

    /// The media toolchain failed on a job-level step.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Play mode was requested but the rendered artifact is unusable.
    #[error("nothing to play: {0}")]
    Playback(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_reason(reason: &Option<String>) -> String {
    match reason {
        Some(r) if !r.is_empty() => format!(": {r}"),
        _ => String::new(),
    }
}
