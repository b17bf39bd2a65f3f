//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// GeneralConfig
// ---------------------------------------------------------------------------

/// Locale settings shared by every task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// UI language for user-visible signals (`"en"` or `"zh"`).
    pub locale: String,
    /// Default source language handed to recognizers and TTS engines.
    pub default_language: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            locale: "en".into(),
            default_language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

/// Root directories for task output and scratch files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for user-facing output (subtitles land in `<home_dir>/recogn`).
    pub home_dir: PathBuf,
    /// Root for scratch files (intermediate audio, decoded payloads).
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let paths = AppPaths::new();
        Self {
            home_dir: paths.home_dir,
            temp_dir: paths.temp_dir,
        }
    }
}

// ---------------------------------------------------------------------------
// DubbingConfig
// ---------------------------------------------------------------------------

/// Settings for text-to-speech batch jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DubbingConfig {
    /// Registry tag of the TTS provider (e.g. `"http"`).
    pub provider: String,
    /// Endpoint of the HTTP TTS service.
    pub api_url: String,
    /// Worker-pool size for the first dispatch pass.
    pub threads: usize,
    /// Trim trailing silence from every rendered line.
    pub remove_silence: bool,
    /// Pause before the single retry pass, in seconds.
    pub retry_cooldown_secs: u64,
    /// Artifacts smaller than this are treated as failed renders.
    pub min_output_bytes: u64,
    /// Per-request timeout for the HTTP provider.
    pub timeout_secs: u64,
}

impl Default for DubbingConfig {
    fn default() -> Self {
        Self {
            provider: "http".into(),
            api_url: "http://127.0.0.1:9880/tts".into(),
            threads: 5,
            remove_silence: false,
            retry_cooldown_secs: 5,
            min_output_bytes: 1,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Settings for speech-to-text jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Registry tag of the recognizer (e.g. `"http"`).
    pub recogn_type: String,
    /// How the recognizer splits the audio (`"all"` or `"avg"`).
    pub split_type: String,
    /// Model identifier passed through to the recognizer.
    pub model_name: String,
    /// Spoken language, or `"auto"` for detection.
    pub language: String,
    /// Ask the recognizer for GPU-accelerated inference.
    pub use_gpu: bool,
    /// Remove the source media once its subtitles are written.
    pub delete_source: bool,
    /// Endpoint of the HTTP recognition service.
    pub api_url: String,
    /// Per-request timeout for the HTTP recognizer.
    pub timeout_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            recogn_type: "http".into(),
            split_type: "all".into(),
            model_name: "large-v3".into(),
            language: "auto".into(),
            use_gpu: false,
            delete_source: false,
            api_url: "http://127.0.0.1:9977/api".into(),
            timeout_secs: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use speech_tasks::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Locale settings.
    pub general: GeneralConfig,
    /// Output and scratch roots.
    pub paths: PathsConfig,
    /// Text-to-speech batch settings.
    pub dubbing: DubbingConfig,
    /// Speech-to-text settings.
    pub recognition: RecognitionConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `true` when user-visible signals should be rendered in Chinese.
    pub fn is_zh(&self) -> bool {
        self.general.locale == "zh"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
