//! Speech-to-text and batch text-to-speech job supervisors.
//!
//! # Modules
//!
//! | Module     | Role                                                  |
//! |------------|-------------------------------------------------------|
//! | `config`   | `settings.toml` persistence and platform paths        |
//! | `error`    | Job-level error taxonomy                              |
//! | `media`    | ffmpeg-backed transcoding, resampling, playback       |
//! | `notify`   | User-visible signal sinks                             |
//! | `queue`    | Per-job work-item arena and voice normalization       |
//! | `registry` | Provider lookup by configuration tag                  |
//! | `stt`      | Recognizer seam and HTTP recognizer                   |
//! | `subtitle` | SRT writer                                            |
//! | `task`     | Speech-to-text and dubbing job supervisors            |
//! | `tts`      | Dispatcher, retry controller, executors, payloads     |

pub mod config;
pub mod error;
pub mod media;
pub mod notify;
pub mod queue;
pub mod registry;
pub mod stt;
pub mod subtitle;
pub mod task;
pub mod tts;

pub use error::TaskError;
