//! One batch invocation: resolve targets, open the error log, run the engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use thiserror::Error;
use tracing::{info, instrument};

use crate::download::{
    BatchObserver, BatchReport, CONNECT_TIMEOUT_SECS, Credential, DEFAULT_CONCURRENCY,
    DownloadEngine, EngineError, FetchContext, FetchPolicy, HttpClient, READ_TIMEOUT_SECS,
};
use crate::error_log::{ERROR_LOG_FILE_NAME, ErrorLog};
use crate::target::{TargetError, TargetRequest, UrlBuilder, resolve_targets};

/// Errors that stop a batch before any job runs.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The request is invalid or a directory could not be created.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// The engine could not be configured or failed to dispatch.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The error log could not be opened.
    #[error("cannot open error log {path}: {source}")]
    ErrorLog {
        /// Log file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl BatchError {
    /// True when the caller supplied bad input, as opposed to an
    /// environment failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Target(TargetError::CreateDir { .. }) | Self::ErrorLog { .. } | Self::HttpClient(_) => {
                false
            }
            Self::Target(_) | Self::Engine(EngineError::InvalidConcurrency { .. }) => true,
            Self::Engine(EngineError::SemaphoreClosed) => false,
        }
    }
}

/// Settings of one batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Which tiles to fetch and where to put them.
    pub targets: TargetRequest,
    /// Maximum jobs in flight.
    pub concurrency: usize,
    /// Session cookie sent with every request.
    pub credential: Credential,
    /// Backoff and acceptance rules.
    pub policy: FetchPolicy,
    /// Download endpoint override.
    pub endpoint: Option<String>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl BatchConfig {
    /// Creates a config with default concurrency, policy, endpoint and timeouts.
    #[must_use]
    pub fn new(targets: TargetRequest, credential: Credential) -> Self {
        Self {
            targets,
            concurrency: DEFAULT_CONCURRENCY,
            credential,
            policy: FetchPolicy::default(),
            endpoint: None,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Runs one batch to completion.
///
/// Every input is validated before the filesystem is touched, so a
/// configuration error leaves no directories and no log behind.
///
/// # Errors
///
/// Returns [`BatchError`] if the batch cannot start. Per-job failures are
/// reported in the returned [`BatchReport`], never as an error.
#[instrument(skip_all, fields(savepath = %config.targets.savepath.display()))]
pub async fn run_batch(
    config: &BatchConfig,
    observer: Arc<dyn BatchObserver>,
    interrupted: Arc<AtomicBool>,
) -> Result<BatchReport, BatchError> {
    let urls = match &config.endpoint {
        Some(endpoint) => UrlBuilder::with_endpoint(endpoint)?,
        None => UrlBuilder::default(),
    };
    let engine = DownloadEngine::new(config.concurrency)?;
    let resolved = resolve_targets(&config.targets)?;

    let savepath = &config.targets.savepath;
    let error_log = ErrorLog::open(savepath)
        .await
        .map_err(|source| BatchError::ErrorLog {
            path: savepath.join(ERROR_LOG_FILE_NAME),
            source,
        })?;
    let client = HttpClient::with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)
        .map_err(BatchError::HttpClient)?;

    let ctx = FetchContext::new(client, Arc::new(config.credential.clone()), Arc::new(error_log))
        .with_urls(urls)
        .with_policy(config.policy.clone())
        .with_observer(observer);

    info!(
        category = %resolved.category,
        pending = resolved.jobs.len(),
        skipped_existing = resolved.skipped_existing,
        "starting downloads"
    );

    let mut report = engine.run(resolved.jobs, Arc::new(ctx), interrupted).await?;
    report.planned = resolved.planned;
    report.skipped_existing = resolved.skipped_existing;
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::download::NoopObserver;

    fn config(root: &std::path::Path, category: &str) -> BatchConfig {
        let targets = TargetRequest::new(root, 5, category, "2020_0p50_combined")
            .with_frequencies(["1in10"])
            .with_tiles(["n25w98"]);
        BatchConfig::new(targets, Credential::new("FedAuth=abc").unwrap())
    }

    #[test]
    fn test_config_defaults() {
        let config = config(std::path::Path::new("out"), "Combined");
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.read_timeout_secs, 300);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_configuration_classification() {
        let invalid = BatchError::Target(TargetError::InvalidCategory {
            value: "Coastal".to_string(),
        });
        assert!(invalid.is_configuration());

        let concurrency = BatchError::Engine(EngineError::InvalidConcurrency { value: 0 });
        assert!(concurrency.is_configuration());

        let io = BatchError::ErrorLog {
            path: PathBuf::from("x"),
            source: std::io::Error::other("denied"),
        };
        assert!(!io.is_configuration());
    }

    #[tokio::test]
    async fn test_invalid_category_has_no_side_effects() {
        let root = TempDir::new().unwrap();
        let savepath = root.path().join("batch");
        let result = run_batch(
            &config(&savepath, "Coastal"),
            Arc::new(NoopObserver),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert!(matches!(
            result,
            Err(BatchError::Target(TargetError::InvalidCategory { .. }))
        ));
        assert!(!savepath.exists());
    }

    #[tokio::test]
    async fn test_invalid_concurrency_has_no_side_effects() {
        let root = TempDir::new().unwrap();
        let savepath = root.path().join("batch");
        let mut config = config(&savepath, "Combined");
        config.concurrency = 0;

        let result = run_batch(&config, Arc::new(NoopObserver), Arc::new(AtomicBool::new(false))).await;

        assert!(matches!(result, Err(BatchError::Engine(_))));
        assert!(!savepath.exists());
    }

    #[tokio::test]
    async fn test_invalid_endpoint_has_no_side_effects() {
        let root = TempDir::new().unwrap();
        let savepath = root.path().join("batch");
        let mut config = config(&savepath, "Combined");
        config.endpoint = Some("ftp://mirror.example/download".to_string());

        let result = run_batch(&config, Arc::new(NoopObserver), Arc::new(AtomicBool::new(false))).await;

        assert!(matches!(
            result,
            Err(BatchError::Target(TargetError::InvalidEndpoint { .. }))
        ));
        assert!(!savepath.exists());
    }

    #[tokio::test]
    async fn test_everything_present_runs_no_jobs() {
        let root = TempDir::new().unwrap();
        let config = config(root.path(), "Combined");
        let destination = root
            .path()
            .join("Scenario 5/Combined/1in10/Combined_n25w98_1in10.tif");
        std::fs::create_dir_all(destination.parent().unwrap()).unwrap();
        std::fs::write(&destination, b"tile").unwrap();

        let report = run_batch(&config, Arc::new(NoopObserver), Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(report.planned, 1);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.dispatched(), 0);
        assert!(report.is_clean());
    }
}
