//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\speech-tasks\
//!   macOS:   ~/Library/Application Support/speech-tasks/
//!   Linux:   ~/.config/speech-tasks/
//!
//! Home dir (task output): `<document dir>/speech-tasks`
//! Temp dir (scratch):     `<cache dir>/speech-tasks/tmp`

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default root for task output.
    pub home_dir: PathBuf,
    /// Default root for scratch files.
    pub temp_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "speech-tasks";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let home_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let temp_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(Self::APP_NAME)
            .join("tmp");

        let settings_file = config_dir.join("settings.toml");

        Self {
            config_dir,
            settings_file,
            home_dir,
            temp_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
