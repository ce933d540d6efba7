//! Retry and backoff policy for tile fetches.
//!
//! This module provides [`FetchPolicy`] and [`FailureType`] for classifying
//! fetch errors and determining retry behavior.
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - network-level failures, retried after a fixed cooldown
//! - [`FailureType::RateLimited`] - HTTP 429, retried after a short randomized backoff
//! - [`FailureType::Permanent`] - everything else, never retried
//!
//! Transient and rate-limited failures share one attempt counter and one
//! maximum. Delays are plain values returned to the caller, which sleeps
//! through a [`Sleeper`](super::Sleeper), so the policy can be tested
//! without waiting.
//!
//! # Example
//!
//! ```
//! use floodtiles_core::download::{FailureType, FetchPolicy, RetryDecision};
//!
//! let policy = FetchPolicy::default();
//! match policy.should_retry(FailureType::RateLimited, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::DownloadError;

/// Default maximum attempts per job, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default minimum plausible tile size in bytes.
///
/// Bodies at or below this size are login pages or placeholders, not rasters.
pub const DEFAULT_MIN_PAYLOAD_BYTES: u64 = 411_422;

/// Default spread of the delay before a job's first request.
const DEFAULT_INITIAL_JITTER: DelayRange = DelayRange::new(Duration::from_secs(1), Duration::from_secs(3));

/// Default fixed wait after a transport failure.
const DEFAULT_TRANSPORT_COOLDOWN: Duration = Duration::from_secs(20);

/// Default spread of the wait after HTTP 429.
const DEFAULT_RATE_LIMIT_BACKOFF: DelayRange =
    DelayRange::new(Duration::from_secs(2), Duration::from_secs(5));

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Network-level failure that may succeed on retry.
    Transient,

    /// Server rate limiting (HTTP 429).
    RateLimited,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Includes expired credentials: the share answers those with an error
    /// status or a tiny login page.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Inclusive range of delays sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Creates a range; bounds are swapped if given in the wrong order.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        if min.as_nanos() <= max.as_nanos() {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that always yields `delay`.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns true when `delay` falls inside the range.
    #[must_use]
    pub fn contains(&self, delay: Duration) -> bool {
        (self.min..=self.max).contains(&delay)
    }

    /// Draws one delay, millisecond resolution.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }
}

/// Backoff strategy and acceptance rules for one job.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `initial_jitter`: 1-3 seconds
/// - `transport_cooldown`: 20 seconds
/// - `rate_limit_backoff`: 2-5 seconds
/// - `min_payload_bytes`: 411 422
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    max_attempts: u32,
    initial_jitter: DelayRange,
    transport_cooldown: Duration,
    rate_limit_backoff: DelayRange,
    min_payload_bytes: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_jitter: DEFAULT_INITIAL_JITTER,
            transport_cooldown: DEFAULT_TRANSPORT_COOLDOWN,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            min_payload_bytes: DEFAULT_MIN_PAYLOAD_BYTES,
        }
    }
}

impl FetchPolicy {
    /// Default policy with every delay set to zero.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            initial_jitter: DelayRange::fixed(Duration::ZERO),
            transport_cooldown: Duration::ZERO,
            rate_limit_backoff: DelayRange::fixed(Duration::ZERO),
            ..Self::default()
        }
    }

    /// Sets the maximum attempts (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the pre-request jitter range.
    #[must_use]
    pub fn with_initial_jitter(mut self, jitter: DelayRange) -> Self {
        self.initial_jitter = jitter;
        self
    }

    /// Sets the wait after a transport failure.
    #[must_use]
    pub fn with_transport_cooldown(mut self, cooldown: Duration) -> Self {
        self.transport_cooldown = cooldown;
        self
    }

    /// Sets the wait range after HTTP 429.
    #[must_use]
    pub fn with_rate_limit_backoff(mut self, backoff: DelayRange) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Sets the minimum plausible body size.
    #[must_use]
    pub fn with_min_payload_bytes(mut self, min_payload_bytes: u64) -> Self {
        self.min_payload_bytes = min_payload_bytes;
        self
    }

    /// Maximum attempts including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Bodies must be strictly larger than this to count as a tile.
    #[must_use]
    pub fn min_payload_bytes(&self) -> u64 {
        self.min_payload_bytes
    }

    /// Pre-request jitter range.
    #[must_use]
    pub fn initial_jitter(&self) -> DelayRange {
        self.initial_jitter
    }

    /// Fixed wait after a transport failure.
    #[must_use]
    pub fn transport_cooldown(&self) -> Duration {
        self.transport_cooldown
    }

    /// Wait range after HTTP 429.
    #[must_use]
    pub fn rate_limit_backoff(&self) -> DelayRange {
        self.rate_limit_backoff
    }

    /// Samples the delay before a job's first request.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_jitter.sample()
    }

    /// Determines whether to retry after a failed attempt.
    ///
    /// `attempt` is the attempt that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        let delay = match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Transient => self.transport_cooldown,
            FailureType::RateLimited => self.rate_limit_backoff.sample(),
        };

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Transport | Transient |
/// | RateLimited (429) | RateLimited |
/// | HttpStatus (any other non-200) | Permanent |
/// | IncompletePayload | Permanent |
/// | Write | Permanent |
/// | TaskPanicked | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::Transport { .. } => FailureType::Transient,
        DownloadError::RateLimited { .. } => FailureType::RateLimited,
        DownloadError::HttpStatus { .. }
        | DownloadError::IncompletePayload { .. }
        | DownloadError::Write { .. }
        | DownloadError::TaskPanicked { .. } => FailureType::Permanent,
    }
}
