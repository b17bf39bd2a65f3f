//! Subtitle persistence.

use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;

use crate::stt::SubtitleEntry;

/// Persists recognized entries.
#[async_trait]
pub trait SubtitleWriter: Send + Sync {
    async fn write(&self, entries: &[SubtitleEntry], path: &Path) -> std::io::Result<()>;
}

/// Writes SubRip (`.srt`) files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SrtWriter;

/// `3723004` → `01:02:03,004`
pub fn srt_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1_000) % 60;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Render entries as SRT text. Lines are numbered from 1 in the given order.
pub fn render_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(entry.start_ms),
            srt_timestamp(entry.end_ms),
            entry.text.trim()
        );
    }
    out
}

#[async_trait]
impl SubtitleWriter for SrtWriter {
    async fn write(&self, entries: &[SubtitleEntry], path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, render_srt(entries)).await
    }
}
