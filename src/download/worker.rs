//! Fetch worker: downloads one tile with retries.
//!
//! Each job runs this state machine in its own task:
//!
//! ```text
//! Pending -> Requesting -> Succeeded
//!                       -> Retrying -> Requesting
//!                       -> Failed
//! ```
//!
//! Transport failures and HTTP 429 share one attempt counter. Every other
//! non-200 status and every undersized body is a permanent failure and is
//! never retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use crate::error_log::ErrorLog;
use crate::target::{Job, UrlBuilder};

use super::client::{partial_path, stream_to_file};
use super::{
    BatchObserver, Credential, DownloadError, DownloadStats, FailureType, FetchPolicy,
    HttpClient, NoopObserver, RetryDecision, Sleeper, TokioSleeper, classify_error,
};

/// Lifecycle state of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Created, waiting for a worker slot.
    Pending,
    /// A request is in flight.
    Requesting,
    /// Backing off before the next attempt.
    Retrying,
    /// The tile is on disk.
    Succeeded,
    /// The job gave up.
    Failed,
}

/// Terminal result of one job.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The tile was written to `path`.
    Succeeded {
        /// Final destination.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// A non-retryable failure.
    PermanentFailure(DownloadError),
    /// Retryable failures used up every attempt.
    ExhaustedRetries {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        last_error: DownloadError,
    },
}

impl FetchOutcome {
    /// Returns true for [`FetchOutcome::Succeeded`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// The error behind a failed outcome.
    #[must_use]
    pub fn error(&self) -> Option<&DownloadError> {
        match self {
            Self::Succeeded { .. } => None,
            Self::PermanentFailure(error) | Self::ExhaustedRetries { last_error: error, .. } => {
                Some(error)
            }
        }
    }

    /// Terminal state matching this outcome.
    #[must_use]
    pub fn state(&self) -> FetchState {
        if self.is_success() {
            FetchState::Succeeded
        } else {
            FetchState::Failed
        }
    }
}

/// Everything a worker shares with the rest of the batch.
///
/// Built once per batch and handed to every task behind an `Arc`.
pub struct FetchContext {
    client: HttpClient,
    credential: Arc<Credential>,
    urls: Arc<UrlBuilder>,
    policy: FetchPolicy,
    sleeper: Arc<dyn Sleeper>,
    error_log: Arc<ErrorLog>,
    observer: Arc<dyn BatchObserver>,
}

impl FetchContext {
    /// Creates a context with the default endpoint, policy, real sleeps and
    /// no observer.
    #[must_use]
    pub fn new(client: HttpClient, credential: Arc<Credential>, error_log: Arc<ErrorLog>) -> Self {
        Self {
            client,
            credential,
            urls: Arc::new(UrlBuilder::default()),
            policy: FetchPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            error_log,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Uses `urls` to build request URLs.
    #[must_use]
    pub fn with_urls(mut self, urls: UrlBuilder) -> Self {
        self.urls = Arc::new(urls);
        self
    }

    /// Replaces the fetch policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the sleeper used for jitter and backoff.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Active fetch policy.
    #[must_use]
    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Shared failure log.
    #[must_use]
    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Progress observer.
    #[must_use]
    pub fn observer(&self) -> &dyn BatchObserver {
        self.observer.as_ref()
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("endpoint", &self.urls.endpoint())
            .field("policy", &self.policy)
            .field("error_log", &self.error_log.path())
            .finish_non_exhaustive()
    }
}

/// Downloads one tile, retrying transport failures and HTTP 429.
///
/// Never returns an error: every failure is folded into the outcome and
/// written to the error log. Retries are counted in `stats`.
#[instrument(skip(ctx, job, stats), fields(file = %job.file_name()))]
pub async fn fetch_job(ctx: &FetchContext, job: &Job, stats: &DownloadStats) -> FetchOutcome {
    let file_name = job.file_name();
    let url = ctx.urls.build_for_job(job);
    debug!(%url, "built tile url");

    ctx.sleeper.sleep(ctx.policy.initial_delay()).await;

    let mut attempt = 0u32;
    let outcome = loop {
        attempt += 1;
        ctx.observer.job_state(job, FetchState::Requesting);

        let error = match attempt_fetch(ctx, job, &url, &file_name).await {
            Ok(bytes) => {
                info!(bytes, path = %job.destination().display(), "tile saved");
                break FetchOutcome::Succeeded {
                    path: job.destination().to_path_buf(),
                    bytes,
                };
            }
            Err(error) => error,
        };

        let failure_type = classify_error(&error);
        match failure_type {
            FailureType::Transient => {
                let message = format!("Exception while downloading {file_name} (attempt {attempt}): {error}");
                warn!("{message}");
                ctx.error_log.record(&message).await;
            }
            FailureType::RateLimited => {
                warn!("429 Too Many Requests for {file_name} (attempt {attempt}), retrying...");
            }
            FailureType::Permanent => {
                let message = error.to_string();
                warn!("{message}");
                ctx.error_log.record(&message).await;
            }
        }

        match ctx.policy.should_retry(failure_type, attempt) {
            RetryDecision::Retry { delay, attempt: next } => {
                debug!(next_attempt = next, delay_ms = delay.as_millis(), "backing off");
                stats.increment_retried();
                ctx.observer.job_state(job, FetchState::Retrying);
                ctx.sleeper.sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(%reason, "giving up");
                if failure_type == FailureType::Permanent {
                    break FetchOutcome::PermanentFailure(error);
                }
                let message = format!("Failed to download {file_name} after {attempt} attempts.");
                warn!("{message}");
                ctx.error_log.record(&message).await;
                break FetchOutcome::ExhaustedRetries {
                    attempts: attempt,
                    last_error: error,
                };
            }
        }
    };

    ctx.observer.job_state(job, outcome.state());
    outcome
}

/// One GET: classify the response, then stream it into place.
///
/// The body goes to a `.part` sibling first and is renamed only once it has
/// passed the size check, so a destination that exists is always complete.
async fn attempt_fetch(
    ctx: &FetchContext,
    job: &Job,
    url: &str,
    file_name: &str,
) -> Result<u64, DownloadError> {
    let response = ctx
        .client
        .get(url, &ctx.credential)
        .await
        .map_err(|e| DownloadError::transport(file_name, e))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(DownloadError::rate_limited(file_name));
    }
    if status != StatusCode::OK {
        return Err(DownloadError::http_status(file_name, status.as_u16()));
    }

    let min_bytes = ctx.policy.min_payload_bytes();
    if let Some(declared) = response.content_length() {
        if declared <= min_bytes {
            return Err(DownloadError::incomplete_payload(
                file_name,
                status.as_u16(),
                declared,
                min_bytes,
            ));
        }
    }

    let partial = partial_path(job.destination());
    let written = match stream_to_file(response, &partial, file_name).await {
        Ok(written) => written,
        Err(error) => {
            discard_partial(&partial).await;
            return Err(error);
        }
    };

    if written <= min_bytes {
        discard_partial(&partial).await;
        return Err(DownloadError::incomplete_payload(
            file_name,
            status.as_u16(),
            written,
            min_bytes,
        ));
    }

    if let Err(e) = tokio::fs::rename(&partial, job.destination()).await {
        discard_partial(&partial).await;
        return Err(DownloadError::write(job.destination(), e));
    }

    Ok(written)
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial file"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_state_mapping() {
        let ok = FetchOutcome::Succeeded {
            path: PathBuf::from("a.tif"),
            bytes: 10,
        };
        assert!(ok.is_success());
        assert_eq!(ok.state(), FetchState::Succeeded);
        assert!(ok.error().is_none());

        let failed = FetchOutcome::PermanentFailure(DownloadError::http_status("a.tif", 404));
        assert_eq!(failed.state(), FetchState::Failed);
        assert_eq!(failed.error().unwrap().kind(), "http_status");

        let exhausted = FetchOutcome::ExhaustedRetries {
            attempts: 5,
            last_error: DownloadError::rate_limited("a.tif"),
        };
        assert!(!exhausted.is_success());
        assert_eq!(exhausted.error().unwrap().kind(), "rate_limited");
    }

    #[tokio::test]
    async fn test_discard_partial_ignores_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        discard_partial(&dir.path().join("missing.tif.part")).await;
    }

    #[tokio::test]
    async fn test_discard_partial_removes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tile.tif.part");
        std::fs::write(&path, b"partial").unwrap();
        discard_partial(&path).await;
        assert!(!path.exists());
    }
}
