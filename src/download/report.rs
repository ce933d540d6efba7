//! Summary of one batch run.

use serde::Serialize;

use super::DownloadError;

/// One failed job, as listed in a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// Tile file name.
    pub file: String,
    /// Error label, see [`DownloadError::kind`].
    pub kind: String,
    /// Attempts made; absent for failures that were never retried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Human-readable error.
    pub message: String,
}

impl JobFailure {
    /// Describes a job that failed without retries.
    #[must_use]
    pub fn permanent(file: impl Into<String>, error: &DownloadError) -> Self {
        Self {
            file: file.into(),
            kind: error.kind().to_string(),
            attempts: None,
            message: error.to_string(),
        }
    }

    /// Describes a job that used up its attempts.
    #[must_use]
    pub fn exhausted(file: impl Into<String>, attempts: u32, last_error: &DownloadError) -> Self {
        Self {
            file: file.into(),
            kind: last_error.kind().to_string(),
            attempts: Some(attempts),
            message: last_error.to_string(),
        }
    }
}

/// Counters and failures of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Size of the tiles × frequencies cross product.
    pub planned: usize,
    /// Jobs skipped because the tile was already on disk.
    pub skipped_existing: usize,
    /// Jobs that saved their tile.
    pub succeeded: usize,
    /// Jobs that failed permanently.
    pub failed: usize,
    /// Jobs that ran out of attempts.
    pub exhausted: usize,
    /// Retry attempts across all jobs.
    pub retried: usize,
    /// Jobs never dispatched because the batch was interrupted.
    pub not_started: usize,
    /// The batch stopped early on an interrupt.
    pub interrupted: bool,
    /// Every failed job, in dispatch order per frequency group.
    pub failures: Vec<JobFailure>,
}

impl BatchReport {
    /// Jobs that ran to a terminal outcome.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.succeeded + self.failed + self.exhausted
    }

    /// Failed plus exhausted jobs.
    #[must_use]
    pub fn failed_total(&self) -> usize {
        self.failed + self.exhausted
    }

    /// True when every planned tile is now on disk.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.interrupted && self.failed_total() == 0 && self.not_started == 0
    }
}
