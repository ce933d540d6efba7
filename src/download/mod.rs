//! Authenticated tile downloads with bounded concurrency.
//!
//! This module fetches tiles over HTTP and streams them to disk.
//!
//! # Features
//!
//! - Streaming downloads through a `.part` file, renamed on success
//! - Minimum-size check that rejects login pages served with status 200
//! - Retry with a fixed cooldown for network errors and a short randomized
//!   backoff for HTTP 429
//! - Semaphore-bounded worker pool, one frequency group at a time
//! - Configurable timeouts (30s connect, 5min read by default)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use floodtiles_core::download::{Credential, DownloadStats, FetchContext, HttpClient, fetch_job};
//! use floodtiles_core::error_log::ErrorLog;
//! use floodtiles_core::target::{Category, Job};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let savepath = Path::new("./src");
//! let error_log = Arc::new(ErrorLog::open(savepath).await?);
//! let credential = Arc::new(Credential::new("FedAuth=...")?);
//! let ctx = FetchContext::new(HttpClient::new()?, credential, error_log);
//! let job = Job::new(savepath, 5, Category::Combined, "1in100", "n30w98", "2020_0p50_combined");
//! let outcome = fetch_job(&ctx, &job, &DownloadStats::new()).await;
//! println!("saved: {}", outcome.is_success());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod credential;
mod engine;
mod error;
mod observer;
mod report;
mod retry;
mod sleeper;
mod worker;

pub use client::{HttpClient, partial_path};
pub use constants::{CHUNK_SIZE, CONNECT_TIMEOUT_SECS, PARTIAL_SUFFIX, READ_TIMEOUT_SECS};
pub use credential::{Credential, CredentialError};
pub use engine::{
    DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats, EngineError, MAX_CONCURRENCY,
    MIN_CONCURRENCY,
};
pub use error::DownloadError;
pub use observer::{BatchObserver, NoopObserver};
pub use report::{BatchReport, JobFailure};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_PAYLOAD_BYTES, DelayRange, FailureType, FetchPolicy,
    RetryDecision, classify_error,
};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
pub use worker::{FetchContext, FetchOutcome, FetchState, fetch_job};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
