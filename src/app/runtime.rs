//! Top-level run: build the batch from CLI arguments, execute it, report.

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use floodtiles_core::batch::{BatchConfig, run_batch};
use floodtiles_core::download::{BatchObserver, BatchReport, Credential, FetchPolicy, NoopObserver};
use floodtiles_core::target::TargetRequest;
use tracing::{debug, error, info, warn};

use super::{exit_handler, progress::ProgressObserver, terminal};
use crate::ProcessExit;
use crate::cli::Args;

pub(crate) async fn run_floodtiles(args: Args) -> Result<ProcessExit> {
    let credential = match Credential::new(&args.cookie) {
        Ok(credential) => credential,
        Err(e) => {
            error!("invalid --cookie: {e}");
            return Ok(ProcessExit::ConfigError);
        }
    };
    let config = build_config(&args, credential);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight downloads");
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let observer: Arc<dyn BatchObserver> = if show_progress {
        Arc::new(ProgressObserver::stderr())
    } else {
        Arc::new(NoopObserver)
    };

    let report = match run_batch(&config, observer, interrupted).await {
        Ok(report) => report,
        Err(e) if e.is_configuration() => {
            error!("{e}");
            return Ok(ProcessExit::ConfigError);
        }
        Err(e) => return Err(e.into()),
    };

    log_summary(&report);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(exit_handler::determine_exit_outcome(&report))
}

fn build_config(args: &Args, credential: Credential) -> BatchConfig {
    let mut targets = TargetRequest::new(&args.savepath, args.scenario, &args.flood_type, &args.code)
        .with_frequencies(args.frequencies.iter().cloned());
    if !args.tiles.is_empty() {
        targets = targets.with_tiles(args.tiles.iter().cloned());
    }

    let mut config = BatchConfig::new(targets, credential);
    config.concurrency = usize::from(args.workers);
    config.policy = FetchPolicy::default().with_min_payload_bytes(args.min_size);
    config.endpoint.clone_from(&args.endpoint);
    debug!(?config, "batch configured");
    config
}

fn log_summary(report: &BatchReport) {
    info!(
        planned = report.planned,
        skipped_existing = report.skipped_existing,
        succeeded = report.succeeded,
        failed = report.failed_total(),
        retried = report.retried,
        "Download complete"
    );
    if report.interrupted {
        warn!(not_started = report.not_started, "batch interrupted; rerun to fetch the remaining tiles");
    }
    for failure in &report.failures {
        debug!(file = %failure.file, kind = %failure.kind, "{}", failure.message);
    }
}
