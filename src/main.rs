//! CLI entry point for the floodtiles tool.

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, info};

mod app;
mod cli;

use cli::Args;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every tile was downloaded or already present.
    Success,
    /// The arguments or request were invalid; nothing was downloaded.
    ConfigError,
    /// The batch ran, but some tiles failed.
    Failures,
    /// Stopped by Ctrl+C before every tile was attempted.
    Interrupted,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::ConfigError => ExitCode::from(1),
            ProcessExit::Failures => ExitCode::from(2),
            ProcessExit::Interrupted => ExitCode::from(130),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ProcessExit::ConfigError.into(),
            };
        }
    };

    app::terminal::init_tracing(app::terminal::default_level(args.verbose, args.quiet));

    debug!(savepath = %args.savepath.display(), flood_type = %args.flood_type, "CLI arguments parsed");
    info!("floodtiles starting");

    match app::runtime::run_floodtiles(args).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
