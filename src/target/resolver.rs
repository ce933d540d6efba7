//! Job enumeration and destination layout.
//!
//! Destinations are a pure function of the job fields:
//!
//! ```text
//! <savepath>/Scenario <scenario>/<category>/<frequency>/<category>_<tile>_<frequency>.tif
//! ```
//!
//! Resolution skips any job whose destination already exists, so re-running
//! a batch only attempts the tiles that are still missing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::{Category, DEFAULT_FREQUENCIES, TEXAS_TILES, TargetError};

/// One downloadable tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    scenario: u32,
    category: Category,
    frequency: String,
    tile: String,
    code: String,
    destination: PathBuf,
}

impl Job {
    /// Creates a job rooted at `savepath`, deriving its destination.
    #[must_use]
    pub fn new(
        savepath: &Path,
        scenario: u32,
        category: Category,
        frequency: impl Into<String>,
        tile: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        let frequency = frequency.into();
        let tile = tile.into();
        let destination = destination_path(savepath, scenario, category, &frequency, &tile);
        Self {
            scenario,
            category,
            frequency,
            tile,
            code: code.into(),
            destination,
        }
    }

    /// Scenario number.
    #[must_use]
    pub fn scenario(&self) -> u32 {
        self.scenario
    }

    /// Flood category.
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Annual-exceedance frequency label, e.g. `1in100`.
    #[must_use]
    pub fn frequency(&self) -> &str {
        &self.frequency
    }

    /// Tile identifier, e.g. `n30w98`.
    #[must_use]
    pub fn tile(&self) -> &str {
        &self.tile
    }

    /// Dataset code embedded in the remote file name.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Where the tile is written on success.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Local file name of the tile.
    #[must_use]
    pub fn file_name(&self) -> String {
        tile_file_name(self.category, &self.tile, &self.frequency)
    }
}

/// A batch request as supplied by the caller.
///
/// `category` is kept as the raw caller string; it is validated by
/// [`resolve_targets`] before anything touches the filesystem.
#[derive(Debug, Clone)]
pub struct TargetRequest {
    /// Root directory of the on-disk layout.
    pub savepath: PathBuf,
    /// Scenario number.
    pub scenario: u32,
    /// Flood category name.
    pub category: String,
    /// Dataset code.
    pub code: String,
    /// Frequencies to download, processed in this order.
    pub frequencies: Vec<String>,
    /// Tiles to download.
    pub tiles: Vec<String>,
}

impl TargetRequest {
    /// Creates a request covering every Texas tile and the default frequencies.
    #[must_use]
    pub fn new(
        savepath: impl Into<PathBuf>,
        scenario: u32,
        category: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            savepath: savepath.into(),
            scenario,
            category: category.into(),
            code: code.into(),
            frequencies: DEFAULT_FREQUENCIES.iter().map(ToString::to_string).collect(),
            tiles: TEXAS_TILES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replaces the frequency list.
    #[must_use]
    pub fn with_frequencies<I, S>(mut self, frequencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frequencies = frequencies.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the tile list.
    #[must_use]
    pub fn with_tiles<I, S>(mut self, tiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tiles = tiles.into_iter().map(Into::into).collect();
        self
    }
}

/// Output of [`resolve_targets`].
#[derive(Debug, Clone)]
pub struct ResolvedTargets {
    /// Validated category.
    pub category: Category,
    /// Jobs still to download, frequency-major.
    pub jobs: Vec<Job>,
    /// Size of the tiles × frequencies cross product, repeats collapsed.
    pub planned: usize,
    /// Jobs dropped because their destination already exists.
    pub skipped_existing: usize,
}

/// Validates a request without touching the filesystem.
///
/// # Errors
///
/// Returns the first [`TargetError`] found; the category is checked first.
pub fn validate_request(request: &TargetRequest) -> Result<Category, TargetError> {
    let category: Category = request.category.parse()?;

    if request.code.trim().is_empty() {
        return Err(TargetError::EmptyCode);
    }
    if request.frequencies.is_empty() {
        return Err(TargetError::NoFrequencies);
    }
    if request.tiles.is_empty() {
        return Err(TargetError::NoTiles);
    }
    for frequency in &request.frequencies {
        if !is_path_component(frequency) {
            return Err(TargetError::invalid_component("frequency", frequency));
        }
    }
    for tile in &request.tiles {
        if !is_path_component(tile) {
            return Err(TargetError::invalid_component("tile", tile));
        }
    }

    Ok(category)
}

/// Enumerates the jobs of a batch and prepares destination directories.
///
/// Repeated frequencies and tiles are collapsed to their first occurrence,
/// so every destination appears in at most one job. For each frequency the
/// destination directory is created (including parents); existing
/// directories are fine. Jobs whose destination file already exists are
/// dropped.
///
/// # Errors
///
/// Returns a [`TargetError`] for an invalid request, in which case nothing
/// has been created, or [`TargetError::CreateDir`] if a directory cannot be
/// created.
#[instrument(skip(request), fields(savepath = %request.savepath.display(), scenario = request.scenario))]
pub fn resolve_targets(request: &TargetRequest) -> Result<ResolvedTargets, TargetError> {
    let category = validate_request(request)?;
    let frequencies = first_occurrences(&request.frequencies);
    let tiles = first_occurrences(&request.tiles);

    let planned = frequencies.len() * tiles.len();
    let mut jobs = Vec::with_capacity(planned);
    let mut skipped_existing = 0;

    for frequency in frequencies {
        let dir = destination_dir(&request.savepath, request.scenario, category, frequency);
        std::fs::create_dir_all(&dir).map_err(|source| TargetError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        for &tile in &tiles {
            let job = Job::new(
                &request.savepath,
                request.scenario,
                category,
                frequency,
                tile,
                &request.code,
            );
            if job.destination().exists() {
                debug!(path = %job.destination().display(), "tile already present, skipping");
                skipped_existing += 1;
            } else {
                jobs.push(job);
            }
        }
    }

    info!(
        %category,
        planned,
        pending = jobs.len(),
        skipped_existing,
        "resolved download targets"
    );

    Ok(ResolvedTargets {
        category,
        jobs,
        planned,
        skipped_existing,
    })
}

/// Directory holding every tile of one scenario/category/frequency.
#[must_use]
pub fn destination_dir(savepath: &Path, scenario: u32, category: Category, frequency: &str) -> PathBuf {
    savepath
        .join(format!("Scenario {scenario}"))
        .join(category.as_str())
        .join(frequency)
}

/// Full destination path of one tile.
#[must_use]
pub fn destination_path(
    savepath: &Path,
    scenario: u32,
    category: Category,
    frequency: &str,
    tile: &str,
) -> PathBuf {
    destination_dir(savepath, scenario, category, frequency)
        .join(tile_file_name(category, tile, frequency))
}

/// Local file name of one tile.
#[must_use]
pub fn tile_file_name(category: Category, tile: &str, frequency: &str) -> String {
    format!("{category}_{tile}_{frequency}.tif")
}

fn first_occurrences(values: &[String]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(values.len());
    let unique: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|value| seen.insert(*value))
        .collect();
    if unique.len() < values.len() {
        debug!(dropped = values.len() - unique.len(), "ignoring repeated entries");
    }
    unique
}

fn is_path_component(value: &str) -> bool {
    !value.trim().is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}
