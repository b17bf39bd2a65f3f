//! Job phase state machine and job outcomes.
//!
//! Every job walks the same four phases:
//!
//! ```text
//! Prepare ──▶ AwaitInput ──▶ Process ──▶ Finalize
//!    │            │             │            │
//!    └────────────┴── cancel ───┴────────────┴──▶ JobOutcome::Cancelled
//! ```
//!
//! The cancellation token is checked before entering each phase, never in
//! the middle of one.

use tokio_util::sync::CancellationToken;

/// Phases of a speech-to-text or text-to-speech job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    /// Paths resolved, scratch directories created, input converted.
    #[default]
    Prepare,

    /// Waiting for the converted input to appear on disk.
    AwaitInput,

    /// The recognizer or the dispatch passes are running.
    Process,

    /// Results persisted, scratch removed, success signalled.
    Finalize,
}

impl JobPhase {
    /// The phase after this one, or `None` after [`JobPhase::Finalize`].
    ///
    /// ```
    /// use speech_tasks::task::JobPhase;
    ///
    /// assert_eq!(JobPhase::Prepare.next(), Some(JobPhase::AwaitInput));
    /// assert_eq!(JobPhase::Finalize.next(), None);
    /// ```
    pub fn next(self) -> Option<JobPhase> {
        match self {
            JobPhase::Prepare => Some(JobPhase::AwaitInput),
            JobPhase::AwaitInput => Some(JobPhase::Process),
            JobPhase::Process => Some(JobPhase::Finalize),
            JobPhase::Finalize => None,
        }
    }

    /// A short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            JobPhase::Prepare => "prepare",
            JobPhase::AwaitInput => "await-input",
            JobPhase::Process => "process",
            JobPhase::Finalize => "finalize",
        }
    }

    /// `true` if `cancel` still allows entering this phase.
    pub fn enter(self, job: &str, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            log::info!("{job}: cancelled before {}", self.label());
            return false;
        }
        log::debug!("{job}: entering {}", self.label());
        true
    }
}

/// How a job ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Completed(T),
    /// The job observed cancellation at a phase boundary and stopped.
    Cancelled,
}

impl<T> JobOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            JobOutcome::Completed(value) => Some(value),
            JobOutcome::Cancelled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_prepare() {
        assert_eq!(JobPhase::default(), JobPhase::Prepare);
    }

    #[test]
    fn phases_run_in_order() {
        let mut phase = JobPhase::Prepare;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(
            seen,
            vec![
                JobPhase::Prepare,
                JobPhase::AwaitInput,
                JobPhase::Process,
                JobPhase::Finalize
            ]
        );
    }

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> = [
            JobPhase::Prepare,
            JobPhase::AwaitInput,
            JobPhase::Process,
            JobPhase::Finalize,
        ]
        .iter()
        .map(JobPhase::label)
        .collect();
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn enter_is_gated_by_cancellation() {
        let cancel = CancellationToken::new();
        assert!(JobPhase::Process.enter("test", &cancel));
        cancel.cancel();
        assert!(!JobPhase::Process.enter("test", &cancel));
    }

    #[test]
    fn child_token_sees_parent_cancellation() {
        let root = CancellationToken::new();
        let job = root.child_token();
        root.cancel();
        assert!(!JobPhase::Prepare.enter("test", &job));
    }

    #[test]
    fn outcome_accessors() {
        assert_eq!(JobOutcome::Completed(3).completed(), Some(3));
        assert!(JobOutcome::<u8>::Cancelled.is_cancelled());
        assert_eq!(JobOutcome::<u8>::Cancelled.completed(), None);
    }
}
