//! Retry controller: at most one retry, serialized, after a cool-down.
//!
//! # State machine
//!
//! ```text
//! pass 1 @ concurrency N
//!   ├─ failed == total        → TotalFailure (no retry: something systemic)
//!   ├─ failed == 0            → done
//!   └─ 0 < failed < total     → concurrency = 1, completed = 0,
//!                               re-snapshot, cool down,
//!                               pass 2 over the failed indices only
//! final check: failed * 3 > total → ExcessiveFailure, else accepted
//! ```
//!
//! A partial failure is assumed to be transient (rate limiting, a flaky
//! network), so it is retried once with a single worker.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::notify::{SharedSink, Signal};
use crate::queue::WorkQueue;

use super::dispatcher::{Dispatcher, PassOutcome};
use super::executor::OutputValidator;
use super::state::JobState;

/// Initial pass plus one retry.
pub const MAX_PASSES: usize = 2;

/// Default pause before the retry pass.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Summary of a finished (possibly degraded) dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryReport {
    pub total: usize,
    /// Items still without a valid artifact.
    pub failed: usize,
    pub passes: usize,
    /// Concurrency of the last pass.
    pub concurrency: usize,
}

impl RetryReport {
    pub fn is_degraded(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Finished(RetryReport),
    Cancelled,
}

/// `true` when more than a third of the items failed.
pub fn exceeds_failure_threshold(failed: usize, total: usize) -> bool {
    failed * 3 > total
}

pub struct RetryController {
    dispatcher: Dispatcher,
    validator: OutputValidator,
    cooldown: Duration,
    sink: SharedSink,
    retry_message: String,
}

impl RetryController {
    pub fn new(dispatcher: Dispatcher, validator: OutputValidator, sink: SharedSink) -> Self {
        Self {
            dispatcher,
            validator,
            cooldown: DEFAULT_COOLDOWN,
            sink,
            retry_message: "Failed dubbing exists, try retrying".into(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Text of the info signal emitted before the retry pass.
    pub fn with_retry_message(mut self, message: impl Into<String>) -> Self {
        self.retry_message = message.into();
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Drive the queue to a final outcome.
    ///
    /// # Errors
    ///
    /// * [`TaskError::TotalFailure`] if every item failed on a pass.
    /// * [`TaskError::ExcessiveFailure`] if more than a third still failed
    ///   after the retry.
    pub async fn run(
        &self,
        queue: &mut WorkQueue,
        state: &Arc<JobState>,
        cancel: &CancellationToken,
    ) -> Result<RetryOutcome, TaskError> {
        let total = queue.len();
        let is_valid = |path: &Path| self.validator.validate(path);

        let mut indices = queue.all_indices();
        let mut passes = 0;

        loop {
            if cancel.is_cancelled() {
                log::info!("retry: cancelled before pass {}", passes + 1);
                return Ok(RetryOutcome::Cancelled);
            }

            let concurrency = state.concurrency();
            if let PassOutcome::Cancelled =
                self.dispatcher.run_pass(queue, &indices, state, cancel).await
            {
                return Ok(RetryOutcome::Cancelled);
            }
            passes += 1;

            let failed = queue.count_invalid(is_valid);
            log::debug!("retry: pass {passes} finished, {failed}/{total} failed");

            if failed >= total {
                let last_error = self.last_error(queue, state);
                log::error!("retry: all {total} item(s) failed, not retrying");
                return Err(TaskError::TotalFailure { total, last_error });
            }

            // Single-item jobs and clean passes stop here.
            if failed == 0 || total == 1 || passes >= MAX_PASSES {
                return self.finish(queue, state, failed, passes, concurrency);
            }

            log::error!("retry: {failed} of {total} item(s) failed, retrying with one worker");
            self.sink.emit(Signal::info(self.retry_message.clone()));
            state.reduce_concurrency(1);
            state.reset_completed();
            indices = queue.retry_snapshot(is_valid);

            tokio::select! {
                _ = tokio::time::sleep(self.cooldown) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    fn finish(
        &self,
        queue: &WorkQueue,
        state: &JobState,
        failed: usize,
        passes: usize,
        concurrency: usize,
    ) -> Result<RetryOutcome, TaskError> {
        let total = queue.len();
        if exceeds_failure_threshold(failed, total) {
            return Err(TaskError::ExcessiveFailure {
                failed,
                total,
                last_error: self.last_error(queue, state),
            });
        }
        if failed > 0 {
            log::warn!("retry: accepting degraded result, {failed}/{total} item(s) missing");
        }
        Ok(RetryOutcome::Finished(RetryReport {
            total,
            failed,
            passes,
            concurrency,
        }))
    }

    fn last_error(&self, queue: &WorkQueue, state: &JobState) -> Option<String> {
        state
            .last_error()
            .or_else(|| queue.last_failure().map(str::to_string))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
