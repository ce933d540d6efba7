//! HTTP client wrapper for fetching tiles.
//!
//! This module provides the `HttpClient` struct which issues authenticated
//! GET requests and streams response bodies to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::COOKIE;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::constants::{CHUNK_SIZE, CONNECT_TIMEOUT_SECS, PARTIAL_SUFFIX, READ_TIMEOUT_SECS};
use super::{Credential, DownloadError};

/// HTTP client for tile downloads.
///
/// Create once per batch and clone into workers; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with default timeouts (30s connect, 5min read).
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Sends one GET with the credential as the `Cookie` header.
    ///
    /// Only transport failures are errors here; every HTTP status is
    /// returned to the caller for classification.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error on connection, DNS, or timeout failure.
    pub async fn get(&self, url: &str, credential: &Credential) -> Result<reqwest::Response, reqwest::Error> {
        debug!("sending request");
        self.client
            .get(url)
            .header(COOKIE, credential.header_value().clone())
            .send()
            .await
    }
}

/// Path of the temporary file a tile is streamed into.
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Streams a response body to `path` in buffered chunks, returning bytes written.
///
/// Body read failures are transport errors; local IO failures are write
/// errors. The caller is responsible for removing `path` on error.
pub(crate) async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    file_name: &str,
) -> Result<u64, DownloadError> {
    let file = File::create(path)
        .await
        .map_err(|e| DownloadError::write(path, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::transport(file_name, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::write(path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::write(path, e))?;

    Ok(bytes_written)
}
