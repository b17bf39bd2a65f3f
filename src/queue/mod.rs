//! Work-item queue: the per-job arena of lines to render.
//!
//! A [`WorkQueue`] is built once per job from the caller's items. The items
//! are cloned on the way in, so nothing the job does afterwards (status
//! updates, retries) can leak back into the caller's data. The queue never
//! grows or shrinks; an item's identity is its index, and output artifacts
//! line up positionally with the caller's subtitle order.
//!
//! ```text
//! caller Vec<WorkItem> ──clone + normalize──▶ WorkQueue { items, status }
//!                                               │
//!           dispatcher writes status[i] ◀───────┤
//!           retry_snapshot() re-reads  ◀────────┘
//! ```

pub mod voice;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

pub use voice::{normalize_hertz, normalize_percent, VoiceParams};

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// One line of synthesis work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Voice / speaker name understood by the provider.
    #[serde(default)]
    pub role: String,
    /// Text to speak.
    pub text: String,
    /// Where the rendered audio artifact must be written.
    pub filename: PathBuf,
    /// Rate / volume / pitch, normalized when the queue is built.
    #[serde(flatten)]
    pub voice: VoiceParams,
    /// Provider-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkItem {
    pub fn new(role: impl Into<String>, text: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
            filename: filename.into(),
            voice: VoiceParams::default(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_voice(mut self, voice: VoiceParams) -> Self {
        self.voice = voice;
        self
    }
}

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Outcome of the most recent attempt on one item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemStatus {
    /// Not attempted yet, or queued again for the retry pass.
    #[default]
    Pending,
    /// The executor returned successfully.
    Done,
    /// The executor failed or panicked; the reason is kept for reporting.
    Failed(String),
}

// ---------------------------------------------------------------------------
// WorkQueue
// ---------------------------------------------------------------------------

/// Fixed-size, index-addressed arena of work items for one job.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    items: Vec<WorkItem>,
    status: Vec<ItemStatus>,
}

impl WorkQueue {
    /// Clone `items` into a new queue, normalizing each item's voice
    /// parameters.
    ///
    /// # Errors
    ///
    /// [`TaskError::EmptyJob`] when `items` is empty.
    pub fn new(items: &[WorkItem]) -> Result<Self, TaskError> {
        if items.is_empty() {
            return Err(TaskError::EmptyJob);
        }
        let items: Vec<WorkItem> = items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                item.voice = item.voice.normalized();
                item
            })
            .collect();
        let status = vec![ItemStatus::Pending; items.len()];
        Ok(Self { items, status })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`; construction rejects empty input.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut WorkItem> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter()
    }

    /// Output paths in queue order.
    pub fn filenames(&self) -> Vec<&Path> {
        self.items.iter().map(|it| it.filename.as_path()).collect()
    }

    /// Every index, in order. Used for the first pass.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.items.len()).collect()
    }

    pub fn status(&self, index: usize) -> Option<&ItemStatus> {
        self.status.get(index)
    }

    /// Record the outcome of an attempt. Out-of-range indices are ignored.
    pub fn set_status(&mut self, index: usize, status: ItemStatus) {
        if let Some(slot) = self.status.get_mut(index) {
            *slot = status;
        }
    }

    /// Count items whose artifact does not pass `is_valid`.
    pub fn count_invalid(&self, is_valid: impl Fn(&Path) -> bool) -> usize {
        self.items.iter().filter(|it| !is_valid(&it.filename)).count()
    }

    /// Re-read the current arena ahead of a retry pass.
    ///
    /// Items whose artifact is valid keep their status and their file; every
    /// other item goes back to [`ItemStatus::Pending`] and its index is
    /// returned, in queue order.
    pub fn retry_snapshot(&mut self, is_valid: impl Fn(&Path) -> bool) -> Vec<usize> {
        let mut outstanding = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            if !is_valid(&item.filename) {
                self.status[index] = ItemStatus::Pending;
                outstanding.push(index);
            }
        }
        outstanding
    }

    /// Last recorded failure reason, scanning from the end of the queue.
    pub fn last_failure(&self) -> Option<&str> {
        self.status.iter().rev().find_map(|s| match s {
            ItemStatus::Failed(reason) => Some(reason.as_str()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
