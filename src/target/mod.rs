//! Target resolution: which tiles to fetch, from where, and to where.
//!
//! - [`url`] maps a tile identity to its download URL
//! - [`resolver`] enumerates jobs and their destination paths
//! - [`tiles`] holds the fixed catalog (categories, frequencies, tile grid)

mod error;
pub mod resolver;
mod tiles;
pub mod url;

pub use error::TargetError;
pub use resolver::{
    Job, ResolvedTargets, TargetRequest, destination_dir, destination_path, resolve_targets,
    tile_file_name, validate_request,
};
pub use tiles::{Category, DEFAULT_DATASET_CODE, DEFAULT_FREQUENCIES, TEXAS_TILES};
pub use url::{DEFAULT_ENDPOINT, EXISTING_CONDITIONS_SCENARIO, UrlBuilder, build_url, encode_segment};
