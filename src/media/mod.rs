//! Media toolchain seam.
//!
//! The task core never runs `ffmpeg` directly; it goes through
//! [`MediaToolchain`] so tests can substitute a double and so a different
//! backend can be dropped in. [`FfmpegToolchain`] is the production
//! implementation.

pub mod ffmpeg;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use ffmpeg::FfmpegToolchain;

/// Errors raised by media conversion.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The binary could not be spawned at all.
    #[error("{program} not found: {source}")]
    NotFound {
        program: &'static str,
        source: std::io::Error,
    },

    /// The binary ran but exited unsuccessfully.
    #[error("{program} failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        program: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The input file does not exist.
    #[error("input not found: {0}")]
    InputNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the task core needs from the media toolchain.
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Convert `input` to the container/codec implied by `output`'s
    /// extension.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError>;

    /// Produce a 16 kHz mono PCM wav suitable for recognizers.
    async fn resample_to_16k_mono(&self, input: &Path, output: &Path) -> Result<(), MediaError>;

    /// Strip silence from the end of `path`, in place.
    async fn trim_trailing_silence(&self, path: &Path) -> Result<(), MediaError>;

    /// Start playing `path` in the background. Returns once playback has
    /// been launched, not when it finishes.
    async fn play(&self, path: &Path) -> Result<(), MediaError>;
}

// ---------------------------------------------------------------------------
// MockToolchain  (test-only)
// ---------------------------------------------------------------------------

/// One recorded toolchain call.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Transcode(std::path::PathBuf, std::path::PathBuf),
    Resample(std::path::PathBuf, std::path::PathBuf),
    Trim(std::path::PathBuf),
    Play(std::path::PathBuf),
}

/// A toolchain double: records every call and fakes the outputs by copying
/// bytes, so tests can run without ffmpeg installed.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockToolchain {
    calls: std::sync::Mutex<Vec<MediaCall>>,
    /// When set, `resample_to_16k_mono` records the call but writes nothing.
    pub skip_resample_output: bool,
    /// When set, `transcode` records the call and fails.
    pub fail_transcode: bool,
    /// When set, `trim_trailing_silence` records the call and fails.
    pub fail_trim: bool,
}

#[cfg(test)]
impl MockToolchain {
    /// A double whose resample step never produces its output file.
    pub fn without_resample_output() -> Self {
        Self {
            skip_resample_output: true,
            ..Self::default()
        }
    }

    /// A double whose transcode step always exits unsuccessfully.
    pub fn failing_transcode() -> Self {
        Self {
            fail_transcode: true,
            ..Self::default()
        }
    }

    /// A double whose silence trim always exits unsuccessfully.
    pub fn failing_trim() -> Self {
        Self {
            fail_trim: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transcode_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MediaCall::Transcode(..)))
            .count()
    }

    fn record(&self, call: MediaCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[cfg(test)]
fn scripted_failure(stderr: &str) -> MediaError {
    MediaError::ExecutionFailed {
        program: "ffmpeg",
        exit_code: Some(1),
        stderr: stderr.to_string(),
    }
}

#[cfg(test)]
#[async_trait]
impl MediaToolchain for MockToolchain {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        self.record(MediaCall::Transcode(input.to_path_buf(), output.to_path_buf()));
        if self.fail_transcode {
            return Err(scripted_failure("unsupported codec"));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn resample_to_16k_mono(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        self.record(MediaCall::Resample(input.to_path_buf(), output.to_path_buf()));
        if !input.exists() {
            return Err(MediaError::InputNotFound(input.display().to_string()));
        }
        if !self.skip_resample_output {
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(input, output).await?;
        }
        Ok(())
    }

    async fn trim_trailing_silence(&self, path: &Path) -> Result<(), MediaError> {
        self.record(MediaCall::Trim(path.to_path_buf()));
        if self.fail_trim {
            return Err(scripted_failure("silenceremove filter failed"));
        }
        Ok(())
    }

    async fn play(&self, path: &Path) -> Result<(), MediaError> {
        self.record(MediaCall::Play(path.to_path_buf()));
        Ok(())
    }
}
