//! Progress hooks for a running batch.
//!
//! The engine reports lifecycle events through [`BatchObserver`]; the binary
//! implements it with progress bars, tests implement it to watch scheduling.

use crate::target::Job;

use super::{FetchOutcome, FetchState};

/// Receives batch progress events. Every method defaults to a no-op.
///
/// Methods are called from worker tasks concurrently and must not block.
pub trait BatchObserver: Send + Sync {
    /// A frequency group is about to be dispatched with `total` jobs.
    fn group_started(&self, _frequency: &str, _total: usize) {}

    /// A job moved to `state`.
    fn job_state(&self, _job: &Job, _state: FetchState) {}

    /// A job reached its terminal outcome.
    fn job_finished(&self, _job: &Job, _outcome: &FetchOutcome) {}

    /// Every dispatched job of a frequency group has finished.
    fn group_finished(&self, _frequency: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}
