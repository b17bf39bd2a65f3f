//! Speech recognition seam.
//!
//! # Architecture
//!
//! ```text
//! SpeechToTextTask ──RecognitionRequest──▶ Recognizer (trait)
//!                                           ├─ HttpRecognizer
//!                                           └─ … any registered provider
//!                  ◀──Vec<SubtitleEntry>──
//! ```

pub mod engine;
pub mod http;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{RecognitionRequest, RecognizeError, Recognizer, SubtitleEntry};
pub use http::HttpRecognizer;

#[cfg(test)]
pub use engine::MockRecognizer;
