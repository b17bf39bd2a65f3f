//! Parallel dispatcher: runs the item executor over a queue.
//!
//! # Pass flow
//!
//! ```text
//! run_pass(queue, indices)
//!   ├─ cancelled?            → PassOutcome::Cancelled (nothing scheduled)
//!   ├─ queue.len() == 1      → executor awaited inline, no pool
//!   └─ otherwise             → one JoinSet task per index,
//!                              Semaphore(concurrency) bounds execution,
//!                              wait for every task, write status[i]
//! ```
//!
//! Executor errors and panics are caught here and turned into
//! [`ItemStatus::Failed`]; nothing an item does can fail the pass itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::queue::{ItemStatus, WorkItem, WorkQueue};

use super::executor::{ExecutorError, ItemExecutor};
use super::state::JobState;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every scheduled item was attempted.
    Completed { attempted: usize },
    /// Cancellation was observed before anything was scheduled.
    Cancelled,
}

/// Runs one executor over work queues with a bounded worker pool.
pub struct Dispatcher {
    executor: Arc<dyn ItemExecutor>,
    pool_runs: AtomicUsize,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn ItemExecutor>) -> Self {
        Self {
            executor,
            pool_runs: AtomicUsize::new(0),
        }
    }

    /// Number of passes that went through the worker pool.
    pub fn pool_runs(&self) -> usize {
        self.pool_runs.load(Ordering::SeqCst)
    }

    /// Attempt every item in `indices` exactly once.
    ///
    /// Completion order is irrelevant: results are written back to the queue
    /// by index.
    pub async fn run_pass(
        &self,
        queue: &mut WorkQueue,
        indices: &[usize],
        state: &Arc<JobState>,
        cancel: &CancellationToken,
    ) -> PassOutcome {
        if cancel.is_cancelled() {
            log::info!("dispatcher: cancelled before scheduling");
            return PassOutcome::Cancelled;
        }
        if indices.is_empty() {
            return PassOutcome::Completed { attempted: 0 };
        }

        if queue.len() == 1 {
            return self.run_inline(queue, state).await;
        }

        self.run_pool(queue, indices, state).await
    }

    async fn run_inline(&self, queue: &mut WorkQueue, state: &Arc<JobState>) -> PassOutcome {
        let Some(item) = queue.get(0) else {
            return PassOutcome::Completed { attempted: 0 };
        };
        let result = self.executor.process(item).await;
        record(queue, state, 0, 1, result);
        PassOutcome::Completed { attempted: 1 }
    }

    async fn run_pool(
        &self,
        queue: &mut WorkQueue,
        indices: &[usize],
        state: &Arc<JobState>,
    ) -> PassOutcome {
        self.pool_runs.fetch_add(1, Ordering::SeqCst);

        let workers = state.concurrency();
        let total = indices.len();
        log::info!(
            "dispatcher: {} pass over {total} item(s) with {workers} worker(s)",
            self.executor.name()
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut set: JoinSet<(usize, Result<(), ExecutorError>)> = JoinSet::new();

        for &index in indices {
            let Some(item) = queue.get(index).cloned() else {
                log::warn!("dispatcher: index {index} out of range, skipped");
                continue;
            };
            let executor = Arc::clone(&self.executor);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (index, Err(ExecutorError::Panicked("worker pool closed".into())));
                    }
                };
                (index, execute_isolated(executor, item).await)
            });
        }

        let mut attempted = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => {
                    attempted += 1;
                    record(queue, state, index, total, result);
                }
                Err(e) => log::error!("dispatcher: worker task lost: {e}"),
            }
        }

        PassOutcome::Completed { attempted }
    }
}

/// Run the executor on its own task so a panic surfaces as a `JoinError`
/// instead of tearing down the pool.
async fn execute_isolated(executor: Arc<dyn ItemExecutor>, item: WorkItem) -> Result<(), ExecutorError> {
    let handle = tokio::spawn(async move { executor.process(&item).await });
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(ExecutorError::Panicked(e.to_string())),
    }
}

fn record(
    queue: &mut WorkQueue,
    state: &JobState,
    index: usize,
    total: usize,
    result: Result<(), ExecutorError>,
) {
    match result {
        Ok(()) => {
            let done = state.mark_completed();
            log::debug!("dispatcher: item {index} done ({done}/{total})");
            queue.set_status(index, ItemStatus::Done);
        }
        Err(e) => {
            let message = e.to_string();
            log::warn!("dispatcher: item {index} failed: {message}");
            state.record_error(message.clone());
            queue.set_status(index, ItemStatus::Failed(message));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
