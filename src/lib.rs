//! Floodtiles Core Library
//!
//! This library provides the core functionality for the floodtiles tool,
//! which batch-downloads floodplain depth raster tiles from an authenticated
//! file share into a scenario/category/frequency directory tree.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`target`] - Tile catalog, URL construction, and job enumeration
//! - [`download`] - Fetch worker, retry policy, and bounded-concurrency engine
//! - [`error_log`] - Append-only, timestamped failure log
//! - [`batch`] - One batch run tying the above together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod download;
pub mod error_log;
pub mod target;

// Re-export commonly used types
pub use batch::{BatchConfig, BatchError, run_batch};
pub use download::{
    BatchObserver, BatchReport, Credential, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS,
    DownloadEngine, DownloadError, DownloadStats, EngineError, FailureType, FetchContext,
    FetchOutcome, FetchPolicy, HttpClient, RetryDecision, classify_error, fetch_job,
};
pub use error_log::ErrorLog;
pub use target::{Category, Job, TargetError, TargetRequest, UrlBuilder, build_url, resolve_targets};
