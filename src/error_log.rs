//! Durable failure log shared by every worker of a batch.
//!
//! One file per save path, `download_errors.log`, opened once per batch in
//! append mode. Each record is a single line:
//!
//! ```text
//! [2025-06-17 14:03:11] Failed to download Combined_n25w98_1in10.tif after 5 attempts.
//! ```
//!
//! Lines from concurrent workers may interleave in any order, but each line
//! is written whole under a lock.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File name of the error log inside the save path.
pub const ERROR_LOG_FILE_NAME: &str = "download_errors.log";

/// Append-only, timestamped failure log.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ErrorLog {
    /// Opens (creating if needed) `<savepath>/download_errors.log` for appending.
    ///
    /// `savepath` itself is created if missing.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the directory or file cannot be opened.
    pub async fn open(savepath: &Path) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(savepath).await?;
        let path = savepath.join(ERROR_LOG_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        debug!(path = %path.display(), "opened error log");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped line.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the write or flush fails.
    pub async fn try_record(&self, message: &str) -> std::io::Result<()> {
        let line = format_line(Local::now().naive_local(), message);
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Appends one timestamped line; a failure to write is only traced.
    pub async fn record(&self, message: &str) {
        if let Err(e) = self.try_record(message).await {
            warn!(path = %self.path.display(), error = %e, "failed to write error log");
        }
    }
}

/// Formats one log line, folding embedded newlines so each record stays on one line.
#[must_use]
pub fn format_line(timestamp: NaiveDateTime, message: &str) -> String {
    let single_line = message.replace(['\r', '\n'], " ");
    format!("[{}] {}\n", timestamp.format("%Y-%m-%d %H:%M:%S"), single_line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_format_line_layout() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 6, 17)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap();
        assert_eq!(
            format_line(timestamp, "Failed to download a.tif after 5 attempts."),
            "[2025-06-17 09:05:03] Failed to download a.tif after 5 attempts.\n"
        );
    }

    #[test]
    fn test_format_line_folds_newlines() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let line = format_line(timestamp, "first\nsecond\r\nthird");
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with("first second  third\n"));
    }

    #[tokio::test]
    async fn test_open_creates_savepath_and_file() {
        let root = TempDir::new().unwrap();
        let savepath = root.path().join("nested").join("out");
        let log = ErrorLog::open(&savepath).await.unwrap();
        assert_eq!(log.path(), savepath.join(ERROR_LOG_FILE_NAME));
        assert!(log.path().exists());
    }

    #[tokio::test]
    async fn test_records_append_across_batches() {
        let root = TempDir::new().unwrap();

        let first = ErrorLog::open(root.path()).await.unwrap();
        first.record("first batch failure").await;
        drop(first);

        let second = ErrorLog::open(root.path()).await.unwrap();
        second.record("second batch failure").await;
        drop(second);

        let content = std::fs::read_to_string(root.path().join(ERROR_LOG_FILE_NAME)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first batch failure"));
        assert!(lines[1].ends_with("second batch failure"));
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost_or_split() {
        let root = TempDir::new().unwrap();
        let log = Arc::new(ErrorLog::open(root.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..50 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.record(&format!("worker {i} failed")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 50);
        for line in lines {
            assert!(line.starts_with('['), "{line}");
            assert!(line.ends_with(" failed"), "{line}");
        }
    }
}
