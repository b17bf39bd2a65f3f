//! Text-to-speech batch core.
//!
//! # Architecture
//!
//! ```text
//! TextToSpeechTask
//!   └─ RetryController ── at most 2 passes, cool-down between them
//!        └─ Dispatcher ── JoinSet + Semaphore(JobState::concurrency)
//!             └─ ItemExecutor (trait)
//!                  ├─ HttpTtsExecutor ── decode_audio_payload
//!                  └─ … any registered provider
//! ```

pub mod dispatcher;
pub mod executor;
pub mod http;
pub mod payload;
pub mod retry;
pub mod state;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use dispatcher::{Dispatcher, PassOutcome};
pub use executor::{ExecutorError, ItemExecutor, OutputValidator};
pub use http::HttpTtsExecutor;
pub use payload::{decode_audio_payload, encode_audio_payload, PayloadError};
pub use retry::{exceeds_failure_threshold, RetryController, RetryOutcome, RetryReport};
pub use state::JobState;

#[cfg(test)]
pub use executor::ScriptedExecutor;
