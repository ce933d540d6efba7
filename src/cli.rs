//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use floodtiles_core::download::{DEFAULT_CONCURRENCY, DEFAULT_MIN_PAYLOAD_BYTES};
use floodtiles_core::target::{
    DEFAULT_DATASET_CODE, DEFAULT_FREQUENCIES, EXISTING_CONDITIONS_SCENARIO,
};

/// Batch download floodplain depth raster tiles.
///
/// Fetches every tile of one scenario and flood type for each requested
/// return period, skipping tiles already on disk. Failures are appended to
/// `download_errors.log` in the save path.
#[derive(Parser, Debug)]
#[command(name = "floodtiles")]
#[command(author, version, about)]
pub struct Args {
    /// Root directory for downloaded tiles
    #[arg(long, default_value = "src")]
    pub savepath: PathBuf,

    /// Scenario number (5 is existing conditions)
    #[arg(long, default_value_t = EXISTING_CONDITIONS_SCENARIO)]
    pub scenario: u32,

    /// Flood type: Pluvial, Fluvial or Combined
    #[arg(long, default_value = "Combined")]
    pub flood_type: String,

    /// Dataset code embedded in remote file names
    #[arg(long, default_value = DEFAULT_DATASET_CODE)]
    pub code: String,

    /// Return period to download; repeat or comma-separate for several
    #[arg(long = "frequency", value_delimiter = ',', default_values_t = default_frequencies())]
    pub frequencies: Vec<String>,

    /// Only download these tiles (default: every Texas tile)
    #[arg(long = "tile", value_delimiter = ',')]
    pub tiles: Vec<String>,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'w', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: u8,

    /// Session cookie sent with every request
    #[arg(long, env = "FLOODTILES_COOKIE", hide_env_values = true)]
    pub cookie: String,

    /// Responses at or below this many bytes are treated as failed downloads
    #[arg(long, default_value_t = DEFAULT_MIN_PAYLOAD_BYTES)]
    pub min_size: u64,

    /// Override the download endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn default_frequencies() -> Vec<String> {
    DEFAULT_FREQUENCIES.iter().map(ToString::to_string).collect()
}
