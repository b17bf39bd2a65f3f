//! Job supervisors.
//!
//! # Architecture
//!
//! ```text
//! SpeechToTextTask  source ─resample─▶ wav ─Recognizer─▶ entries ─SrtWriter─▶ .srt
//! TextToSpeechTask  Vec<WorkItem> ─WorkQueue─▶ RetryController ─▶ artifacts
//! ```
//!
//! Both run the [`JobPhase`] machine against a per-job
//! `CancellationToken` and report through a [`SignalSink`](crate::notify::SignalSink).
//! Job-fatal errors are logged, signalled, then returned to the caller.

pub mod phase;
pub mod speech_to_text;
pub mod text_to_speech;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use phase::{JobOutcome, JobPhase};
pub use speech_to_text::{SpeechToTextPlan, SpeechToTextRequest, SpeechToTextTask};
pub use text_to_speech::{TextToSpeechRequest, TextToSpeechTask};

use crate::error::TaskError;
use crate::notify::{SharedSink, Signal};

/// Log `error`, emit it as an error signal, and hand it back for `?`.
///
/// Also used by callers that fail while assembling a job, before any task
/// exists to report on their behalf.
pub fn report_failure<E: std::fmt::Display>(job: &str, sink: &SharedSink, error: E) -> E {
    log::error!("{job}: {error}");
    sink.emit(Signal::error(error.to_string()));
    error
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
