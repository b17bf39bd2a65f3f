//! `ffmpeg` / `ffplay` backed [`MediaToolchain`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use super::{MediaError, MediaToolchain};

/// Silence below this level counts as silence when trimming.
const SILENCE_THRESHOLD: &str = "-50dB";
/// Minimum run of silence (seconds) that gets trimmed.
const SILENCE_MIN_SECS: &str = "0.1";

/// Shells out to `ffmpeg` for conversion and `ffplay` for playback.
#[derive(Debug, Clone)]
pub struct FfmpegToolchain {
    ffmpeg: PathBuf,
    ffplay: PathBuf,
}

impl Default for FfmpegToolchain {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffplay: PathBuf::from("ffplay"),
        }
    }
}

impl FfmpegToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit binaries instead of whatever is on `PATH`.
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffplay: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffplay: ffplay.into(),
        }
    }

    async fn run_ffmpeg(&self, args: Vec<OsString>) -> Result<(), MediaError> {
        log::debug!("ffmpeg: {:?}", args);
        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| MediaError::NotFound {
                program: "ffmpeg",
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::ExecutionFailed {
                program: "ffmpeg",
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

fn ensure_exists(path: &Path) -> Result<(), MediaError> {
    if path.exists() {
        Ok(())
    } else {
        Err(MediaError::InputNotFound(path.display().to_string()))
    }
}

fn base_args(input: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
    ]
}

pub(crate) fn transcode_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args = base_args(input);
    args.push(output.as_os_str().to_owned());
    args
}

pub(crate) fn resample_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args = base_args(input);
    args.extend(
        ["-vn", "-ac", "1", "-ar", "16000", "-c:a", "pcm_s16le"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

pub(crate) fn trim_args(input: &Path, output: &Path) -> Vec<OsString> {
    // Reverse, drop leading silence, reverse back: trims only the tail.
    let filter = format!(
        "areverse,silenceremove=start_periods=1:start_duration={SILENCE_MIN_SECS}:start_threshold={SILENCE_THRESHOLD},areverse"
    );
    let mut args = base_args(input);
    args.push("-af".into());
    args.push(filter.into());
    args.push(output.as_os_str().to_owned());
    args
}

/// Sibling scratch path that keeps the extension, so ffmpeg picks the same
/// muxer: `a/line.wav` → `a/line.trim.wav`.
fn trim_scratch_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.trim.{}", ext.to_string_lossy()),
        None => format!("{stem}.trim"),
    };
    path.with_file_name(name)
}

#[async_trait]
impl MediaToolchain for FfmpegToolchain {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        ensure_exists(input)?;
        self.run_ffmpeg(transcode_args(input, output)).await
    }

    async fn resample_to_16k_mono(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        ensure_exists(input)?;
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.run_ffmpeg(resample_args(input, output)).await
    }

    async fn trim_trailing_silence(&self, path: &Path) -> Result<(), MediaError> {
        ensure_exists(path)?;
        let scratch = trim_scratch_path(path);
        if let Err(e) = self.run_ffmpeg(trim_args(path, &scratch)).await {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(e);
        }
        tokio::fs::rename(&scratch, path).await?;
        Ok(())
    }

    async fn play(&self, path: &Path) -> Result<(), MediaError> {
        ensure_exists(path)?;
        let mut child = tokio::process::Command::new(&self.ffplay)
            .args(["-nodisp", "-autoexit", "-loglevel", "quiet"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::NotFound {
                program: "ffplay",
                source,
            })?;

        // Reap the player when it exits so it does not linger as a zombie.
        tokio::spawn(async move {
            if let Err(e) = child.wait().await {
                log::warn!("ffplay: wait failed: {e}");
            }
        });
        Ok(())
    }
}
