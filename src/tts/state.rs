//! Shared bookkeeping for one dubbing job.
//!
//! [`JobState`] is shared between the retry controller and every worker of
//! a pass (`Arc<JobState>`), so all fields are atomics or behind a short
//! mutex. Do **not** hold the error lock across `.await` points.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub struct JobState {
    concurrency: AtomicUsize,
    completed: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl JobState {
    /// Start a job at `concurrency` workers (at least one).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: AtomicUsize::new(concurrency.max(1)),
            completed: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::SeqCst)
    }

    /// Lower the worker bound to `to`. Never raises it.
    pub fn reduce_concurrency(&self, to: usize) {
        self.concurrency.fetch_min(to.max(1), Ordering::SeqCst);
    }

    /// Items completed in the current pass.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Count one more completed item and return the new total.
    pub fn mark_completed(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start counting again for a new pass.
    pub fn reset_completed(&self) {
        self.completed.store(0, Ordering::SeqCst);
    }

    pub fn record_error(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(message.into());
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }
}
