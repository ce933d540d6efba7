//! Shared fixtures for integration tests: mock endpoints, fetch contexts, jobs.

#![allow(dead_code)]

pub mod chunked_server;
pub mod socket_guard;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use floodtiles_core::download::{
    Credential, DelayRange, FetchContext, FetchPolicy, HttpClient, Sleeper,
};
use floodtiles_core::error_log::{ERROR_LOG_FILE_NAME, ErrorLog};
use floodtiles_core::target::{Category, Job, UrlBuilder, destination_dir};
use wiremock::MockServer;

pub const TEST_COOKIE: &str = "FedAuth=test-session";
pub const DATASET_CODE: &str = "2020_0p50_combined";
pub const DOWNLOAD_PATH: &str = "/download.aspx";

/// Minimum payload used by tests, so tile bodies stay small.
pub const MIN_BYTES: u64 = 1024;

pub const INITIAL_JITTER: Duration = Duration::from_secs(1);
pub const TRANSPORT_COOLDOWN: Duration = Duration::from_secs(20);
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(3);

/// A body comfortably above [`MIN_BYTES`].
pub fn tile_body() -> Vec<u8> {
    vec![0x49; 4096]
}

/// A body of exactly `len` bytes.
pub fn body_of_len(len: u64) -> Vec<u8> {
    let len = usize::try_from(len).unwrap_or_else(|e| panic!("body length out of range: {e}"));
    vec![0x49; len]
}

pub fn endpoint(server: &MockServer) -> String {
    format!("{}{DOWNLOAD_PATH}", server.uri())
}

/// Policy with fixed, distinguishable delays for use with a recording sleeper.
pub fn recorded_policy() -> FetchPolicy {
    FetchPolicy::default()
        .with_initial_jitter(DelayRange::fixed(INITIAL_JITTER))
        .with_transport_cooldown(TRANSPORT_COOLDOWN)
        .with_rate_limit_backoff(DelayRange::fixed(RATE_LIMIT_BACKOFF))
        .with_min_payload_bytes(MIN_BYTES)
}

pub async fn fetch_context(
    endpoint: &str,
    savepath: &Path,
    sleeper: Arc<dyn Sleeper>,
) -> Result<FetchContext, Box<dyn std::error::Error>> {
    let error_log = Arc::new(ErrorLog::open(savepath).await?);
    let credential = Arc::new(Credential::new(TEST_COOKIE)?);
    let client = HttpClient::with_timeouts(5, 10)?;
    Ok(FetchContext::new(client, credential, error_log)
        .with_urls(UrlBuilder::with_endpoint(endpoint)?)
        .with_policy(recorded_policy())
        .with_sleeper(sleeper))
}

/// A Combined scenario-5 job whose destination directory exists.
pub fn prepared_job(savepath: &Path, frequency: &str, tile: &str) -> Job {
    let dir = destination_dir(savepath, 5, Category::Combined, frequency);
    std::fs::create_dir_all(dir).unwrap_or_else(|e| panic!("cannot create test directory: {e}"));
    Job::new(savepath, 5, Category::Combined, frequency, tile, DATASET_CODE)
}

pub fn read_error_log(savepath: &Path) -> String {
    std::fs::read_to_string(savepath.join(ERROR_LOG_FILE_NAME)).unwrap_or_default()
}

/// Lists every `.part` file under `root`.
pub fn leftover_partials(root: &Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "part") {
                found.push(path);
            }
        }
    }
    found
}
