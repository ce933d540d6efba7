//! Download engine for concurrent tile fetches.
//!
//! This module provides the `DownloadEngine` which runs fetch workers under
//! a semaphore-based concurrency limit.
//!
//! # Overview
//!
//! Jobs are grouped by frequency and the groups run one after another.
//! Within a group every job gets its own Tokio task; at most `concurrency`
//! of them hold a permit at any time. The engine waits for every dispatched
//! job before moving to the next group.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use floodtiles_core::download::{Credential, DownloadEngine, FetchContext, HttpClient};
//! use floodtiles_core::error_log::ErrorLog;
//! use floodtiles_core::target::{TargetRequest, resolve_targets};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let targets = resolve_targets(&TargetRequest::new("src", 5, "Combined", "2020_0p50_combined"))?;
//! let error_log = Arc::new(ErrorLog::open("src".as_ref()).await?);
//! let credential = Arc::new(Credential::new("FedAuth=...")?);
//! let ctx = Arc::new(FetchContext::new(HttpClient::new()?, credential, error_log));
//! let engine = DownloadEngine::new(8)?;
//! let report = engine.run(targets.jobs, ctx, Arc::new(AtomicBool::new(false))).await?;
//! println!("Succeeded: {}, Failed: {}", report.succeeded, report.failed_total());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::target::Job;

use super::report::{BatchReport, JobFailure};
use super::worker::{FetchContext, FetchOutcome, FetchState, fetch_job};
use super::DownloadError;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// How often a dispatcher waiting for a permit re-checks the interrupt flag.
const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error type for download engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Live counters of a batch run.
///
/// Uses atomic counters for thread-safe updates from concurrent fetch tasks.
#[derive(Debug, Default)]
pub struct DownloadStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
    exhausted: AtomicUsize,
    retried: AtomicUsize,
    not_started: AtomicUsize,
    interrupted: AtomicBool,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tiles saved.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of permanent failures.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of jobs that ran out of attempts.
    #[must_use]
    pub fn exhausted(&self) -> usize {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Returns the total number of jobs finished (completed + failed + exhausted).
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.failed() + self.exhausted()
    }

    /// Returns the number of retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Returns the number of jobs never dispatched.
    #[must_use]
    pub fn not_started(&self) -> usize {
        self.not_started.load(Ordering::SeqCst)
    }

    /// Returns true if dispatching was stopped by an interrupt.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    fn add_not_started(&self, count: usize) {
        self.not_started.fetch_add(count, Ordering::SeqCst);
    }

    fn set_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

/// Download engine for concurrent tile fetches.
///
/// # Concurrency Model
///
/// - Each job runs in its own Tokio task
/// - A semaphore permit is acquired before starting each job
/// - Permits are released automatically when jobs complete (RAII)
/// - A panicking task is counted as a failure and does not stop the batch
///
/// # Interrupts
///
/// When the interrupt flag is set the engine stops dispatching. Jobs already
/// running are left to finish; jobs not yet dispatched are counted as not
/// started.
#[derive(Debug)]
pub struct DownloadEngine {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
}

type JobHandle = (Job, JoinHandle<Option<JobFailure>>);

impl DownloadEngine {
    /// Creates a new download engine with the specified concurrency limit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use floodtiles_core::download::DownloadEngine;
    ///
    /// let engine = DownloadEngine::new(8).unwrap();
    /// assert_eq!(engine.concurrency(), 8);
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(concurrency, "creating download engine");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every job and returns the batch counters.
    ///
    /// Jobs are grouped by frequency in order of first appearance. The
    /// returned report leaves `planned` and `skipped_existing` at zero;
    /// those belong to target resolution.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    ///
    /// Note: Individual job failures do NOT cause this method to error.
    /// They are logged and counted in the report.
    #[instrument(skip(self, jobs, ctx, interrupted), fields(jobs = jobs.len(), concurrency = self.concurrency))]
    pub async fn run(
        &self,
        jobs: Vec<Job>,
        ctx: Arc<FetchContext>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<BatchReport, EngineError> {
        let stats = Arc::new(DownloadStats::new());
        let mut failures = Vec::new();

        info!("starting batch");

        for (frequency, group) in group_by_frequency(jobs) {
            if interrupted.load(Ordering::SeqCst) {
                stats.set_interrupted();
                stats.add_not_started(group.len());
                continue;
            }

            ctx.observer().group_started(&frequency, group.len());
            info!(%frequency, jobs = group.len(), "starting frequency group");

            let handles = self.dispatch_group(group, &ctx, &stats, &interrupted).await?;

            debug!(task_count = handles.len(), "waiting for group to complete");
            for (job, handle) in handles {
                match handle.await {
                    Ok(Some(failure)) => failures.push(failure),
                    Ok(None) => {}
                    Err(e) => {
                        failures.push(handle_task_join_error(&ctx, &job, e, &stats).await);
                    }
                }
            }

            ctx.observer().group_finished(&frequency);
        }

        let report = BatchReport {
            succeeded: stats.completed(),
            failed: stats.failed(),
            exhausted: stats.exhausted(),
            retried: stats.retried(),
            not_started: stats.not_started(),
            interrupted: stats.was_interrupted(),
            failures,
            ..BatchReport::default()
        };

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            exhausted = report.exhausted,
            retried = report.retried,
            not_started = report.not_started,
            interrupted = report.interrupted,
            "batch complete"
        );

        Ok(report)
    }

    /// Spawns one task per job, waiting for a permit before each.
    async fn dispatch_group(
        &self,
        group: Vec<Job>,
        ctx: &Arc<FetchContext>,
        stats: &Arc<DownloadStats>,
        interrupted: &Arc<AtomicBool>,
    ) -> Result<Vec<JobHandle>, EngineError> {
        let mut handles = Vec::with_capacity(group.len());
        let mut pending = group.into_iter();

        while let Some(job) = pending.next() {
            if interrupted.load(Ordering::SeqCst) {
                stop_dispatching(stats, 1 + pending.len());
                break;
            }

            ctx.observer().job_state(&job, FetchState::Pending);

            // Race the permit against the interrupt flag so Ctrl+C during a
            // full-concurrency wait stops dispatching immediately.
            let permit = tokio::select! {
                biased;
                () = wait_for_interrupt(interrupted) => None,
                result = self.semaphore.clone().acquire_owned() => {
                    Some(result.map_err(|_| EngineError::SemaphoreClosed)?)
                }
            };
            let Some(permit) = permit else {
                stop_dispatching(stats, 1 + pending.len());
                break;
            };

            let task_ctx = Arc::clone(ctx);
            let task_stats = Arc::clone(stats);
            let task_job = job.clone();
            handles.push((
                job,
                tokio::spawn(async move {
                    // Permit is dropped when this block exits (RAII)
                    let _permit = permit;
                    let outcome = fetch_job(&task_ctx, &task_job, &task_stats).await;
                    let failure = record_outcome(&task_job, &outcome, &task_stats);
                    task_ctx.observer().job_finished(&task_job, &outcome);
                    failure
                }),
            ));
        }

        Ok(handles)
    }
}

/// Splits jobs into per-frequency groups, keeping first-appearance order.
fn group_by_frequency(jobs: Vec<Job>) -> Vec<(String, Vec<Job>)> {
    let mut groups: Vec<(String, Vec<Job>)> = Vec::new();
    for job in jobs {
        match groups.iter_mut().find(|(frequency, _)| frequency == job.frequency()) {
            Some((_, group)) => group.push(job),
            None => groups.push((job.frequency().to_string(), vec![job])),
        }
    }
    groups
}

fn record_outcome(job: &Job, outcome: &FetchOutcome, stats: &DownloadStats) -> Option<JobFailure> {
    match outcome {
        FetchOutcome::Succeeded { .. } => {
            stats.increment_completed();
            None
        }
        FetchOutcome::PermanentFailure(error) => {
            stats.increment_failed();
            Some(JobFailure::permanent(job.file_name(), error))
        }
        FetchOutcome::ExhaustedRetries {
            attempts,
            last_error,
        } => {
            stats.increment_exhausted();
            Some(JobFailure::exhausted(job.file_name(), *attempts, last_error))
        }
    }
}

fn stop_dispatching(stats: &DownloadStats, remaining: usize) {
    warn!(remaining, "interrupted, not dispatching remaining jobs");
    stats.set_interrupted();
    stats.add_not_started(remaining);
}

async fn wait_for_interrupt(interrupted: &AtomicBool) {
    while !interrupted.load(Ordering::SeqCst) {
        tokio::time::sleep(INTERRUPT_POLL_INTERVAL).await;
    }
}

async fn handle_task_join_error(
    ctx: &FetchContext,
    job: &Job,
    join_error: JoinError,
    stats: &DownloadStats,
) -> JobFailure {
    let error = DownloadError::task_panicked(job.file_name(), join_error.to_string());
    warn!(file = %job.file_name(), error = %join_error, "download task panicked");
    ctx.error_log().record(&error.to_string()).await;
    stats.increment_failed();

    let failure = JobFailure::permanent(job.file_name(), &error);
    ctx.observer()
        .job_finished(job, &FetchOutcome::PermanentFailure(error));
    failure
}
