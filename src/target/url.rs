//! Download URL construction for the floodplain tile share.
//!
//! The remote layout is fixed: every tile lives under a `SourceUrl` query
//! parameter whose path segments are percent-encoded with a small, exact
//! substitution table:
//!
//! | Character | Encoding |
//! |-----------|----------|
//! | space     | `%20`    |
//! | `/`       | `%2F`    |
//! | `_`       | `%5F`    |
//! | `.`       | `%2E`    |
//!
//! All other characters pass through unchanged. General-purpose URL encoders
//! are deliberately not used since they disagree with the share on `_` and `.`.
//!
//! # Example
//!
//! ```
//! use floodtiles_core::target::{Category, build_url};
//!
//! let url = build_url(5, Category::Combined, "1in100", "n30w98", "2020_0p50_combined");
//! assert!(url.contains("Existing%20Conditions"));
//! assert!(url.ends_with("n30w98%5F2020%5F0p50%5Fcombined%5F1in100%2Etif"));
//! ```

use tracing::debug;
use url::Url;

use super::{Category, Job, TargetError};

/// SharePoint download endpoint serving the tiles.
pub const DEFAULT_ENDPOINT: &str =
    "https://twdb.sharepoint.com/teams/Flood_Planning_Submission_Collector/_layouts/15/download.aspx";

/// Already-encoded library root every `SourceUrl` starts with.
const SOURCE_ROOT: &str = "%2Fteams%2FFlood%5FPlanning%5FSubmission%5FCollector%2FShared%20Documents%2F\
    Cursory%20Floodplain%20Dataset%20Phase%202%2FCursory%20Floodplain%20Phase%202%20%2D%20Downloads%2F";

/// Scenario published as the existing-conditions baseline.
pub const EXISTING_CONDITIONS_SCENARIO: u32 = 5;

const SEGMENT_SEPARATOR: &str = "%2F";

/// Builds download URLs against a configurable endpoint.
///
/// Holds no per-request state; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    endpoint: String,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl UrlBuilder {
    /// Creates a builder for the public SharePoint endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for a different endpoint (mirror or test server).
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::InvalidEndpoint`] when the endpoint is not an
    /// absolute http(s) URL or already carries a query string.
    pub fn with_endpoint(endpoint: &str) -> Result<Self, TargetError> {
        let parsed =
            Url::parse(endpoint).map_err(|e| TargetError::invalid_endpoint(endpoint, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TargetError::invalid_endpoint(
                endpoint,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        if parsed.query().is_some() {
            return Err(TargetError::invalid_endpoint(
                endpoint,
                "endpoint must not include a query string",
            ));
        }
        debug!(endpoint, "using custom download endpoint");
        Ok(Self {
            endpoint: endpoint.to_string(),
        })
    }

    /// Returns the endpoint URLs are built against.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the download URL for one tile.
    #[must_use]
    pub fn build(
        &self,
        scenario: u32,
        category: Category,
        frequency: &str,
        tile: &str,
        code: &str,
    ) -> String {
        let mut segments = Vec::with_capacity(5);
        segments.push(scenario_folder(scenario));
        segments.push(format!(
            "Fathom_3m_{}_Peril_Scenario {scenario}_Depth Raster Tiles",
            category.peril_kind()
        ));
        if !category.is_combined() {
            segments.push(category.as_str().to_string());
        }
        segments.push(frequency.to_string());
        segments.push(format!("{tile}_{code}_{frequency}.tif"));

        let source = segments
            .iter()
            .map(|segment| encode_segment(segment))
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR);

        format!("{}?SourceUrl={SOURCE_ROOT}{source}", self.endpoint)
    }

    /// Builds the download URL for a resolved job.
    #[must_use]
    pub fn build_for_job(&self, job: &Job) -> String {
        self.build(
            job.scenario(),
            job.category(),
            job.frequency(),
            job.tile(),
            job.code(),
        )
    }
}

/// Builds the download URL for one tile against [`DEFAULT_ENDPOINT`].
#[must_use]
pub fn build_url(
    scenario: u32,
    category: Category,
    frequency: &str,
    tile: &str,
    code: &str,
) -> String {
    UrlBuilder::default().build(scenario, category, frequency, tile, code)
}

/// Percent-encodes one path segment with the share's substitution table.
#[must_use]
pub fn encode_segment(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            ' ' => encoded.push_str("%20"),
            '/' => encoded.push_str("%2F"),
            '_' => encoded.push_str("%5F"),
            '.' => encoded.push_str("%2E"),
            other => encoded.push(other),
        }
    }
    encoded
}

fn scenario_folder(scenario: u32) -> String {
    if scenario == EXISTING_CONDITIONS_SCENARIO {
        format!("Scenario {scenario} - Existing Conditions")
    } else {
        format!("Scenario {scenario}")
    }
}
