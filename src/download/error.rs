//! Error types for the download module.
//!
//! Each variant is one classification of a single fetch attempt; the retry
//! policy decides what happens next based on [`classify_error`](super::classify_error).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one tile.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection, DNS, timeout, or body-stream failure.
    #[error("network error downloading {file}: {source}")]
    Transport {
        /// Tile file name.
        file: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Server answered HTTP 429.
    #[error("429 Too Many Requests for {file}")]
    RateLimited {
        /// Tile file name.
        file: String,
    },

    /// Any other non-200 status.
    #[error("Download failed or empty file: {file} (Status {status})")]
    HttpStatus {
        /// Tile file name.
        file: String,
        /// The HTTP status code.
        status: u16,
    },

    /// HTTP 200 with a body too small to be a raster tile.
    ///
    /// Usually an expired-session login page or an empty placeholder.
    #[error(
        "Download failed or empty file: {file} (Status {status}, {bytes} bytes, expected more than {min_bytes})"
    )]
    IncompletePayload {
        /// Tile file name.
        file: String,
        /// The HTTP status code.
        status: u16,
        /// Body size observed.
        bytes: u64,
        /// Configured minimum plausible size.
        min_bytes: u64,
    },

    /// Local disk failure while saving the tile.
    #[error("Error saving {path}: {source}")]
    Write {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The task running this job ended abnormally.
    #[error("Error in parallel download of {file}: {message}")]
    TaskPanicked {
        /// Tile file name.
        file: String,
        /// Join error description.
        message: String,
    },
}

impl DownloadError {
    /// Creates a transport error from a reqwest error.
    pub fn transport(file: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            file: file.into(),
            source,
        }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(file: impl Into<String>) -> Self {
        Self::RateLimited { file: file.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(file: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            file: file.into(),
            status,
        }
    }

    /// Creates an incomplete-payload error.
    pub fn incomplete_payload(file: impl Into<String>, status: u16, bytes: u64, min_bytes: u64) -> Self {
        Self::IncompletePayload {
            file: file.into(),
            status,
            bytes,
            min_bytes,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a task-panicked error.
    pub fn task_panicked(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskPanicked {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable label, used in batch reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::RateLimited { .. } => "rate_limited",
            Self::HttpStatus { .. } => "http_status",
            Self::IncompletePayload { .. } => "incomplete_payload",
            Self::Write { .. } => "write",
            Self::TaskPanicked { .. } => "task_panicked",
        }
    }
}
