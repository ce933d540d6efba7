//! Fixed catalog values: flood categories, default frequencies, and the tile grid.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::TargetError;

/// One-degree latitude/longitude tiles covering Texas, south to north.
#[rustfmt::skip]
pub const TEXAS_TILES: &[&str] = &[
    "n25w98",
    "n26w98", "n26w99", "n26w100",
    "n27w97", "n27w98", "n27w99", "n27w100",
    "n28w96", "n28w97", "n28w98", "n28w99", "n28w100", "n28w101", "n28w104",
    "n29w94", "n29w95", "n29w96", "n29w97", "n29w98", "n29w99", "n29w100", "n29w101", "n29w102",
    "n29w103", "n29w104", "n29w105",
    "n30w94", "n30w95", "n30w96", "n30w97", "n30w98", "n30w99", "n30w100", "n30w101", "n30w102",
    "n30w103", "n30w104", "n30w105", "n30w106",
    "n31w94", "n31w95", "n31w96", "n31w97", "n31w98", "n31w99", "n31w100", "n31w101", "n31w102",
    "n31w103", "n31w104", "n31w105", "n31w106", "n31w107",
    "n32w95", "n32w96", "n32w97", "n32w98", "n32w99", "n32w100", "n32w101", "n32w102", "n32w103",
    "n32w104", "n32w105", "n32w106", "n32w107",
    "n33w95", "n33w96", "n33w97", "n33w98", "n33w99", "n33w100", "n33w101", "n33w102", "n33w103",
    "n33w104",
    "n34w98", "n34w99", "n34w100", "n34w101", "n34w102", "n34w103", "n34w104",
    "n35w100", "n35w101", "n35w102", "n35w103", "n35w104",
    "n36w100", "n36w101", "n36w102", "n36w103", "n36w104",
];

/// Annual-exceedance frequencies published for every scenario.
pub const DEFAULT_FREQUENCIES: &[&str] = &["1in10", "1in100", "1in25", "1in5", "1in500"];

/// Dataset code used by the published 2020 half-meter combined rasters.
pub const DEFAULT_DATASET_CODE: &str = "2020_0p50_combined";

/// Flood category of a depth raster.
///
/// Names are case-sensitive because they double as remote folder names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Rainfall-driven flooding.
    Pluvial,
    /// Riverine flooding.
    Fluvial,
    /// Combined-peril rasters (no per-category subfolder remotely).
    Combined,
}

impl Category {
    /// Every accepted category, in display order.
    pub const ALL: [Self; 3] = [Self::Pluvial, Self::Fluvial, Self::Combined];

    /// Returns the canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pluvial => "Pluvial",
            Self::Fluvial => "Fluvial",
            Self::Combined => "Combined",
        }
    }

    /// Returns true for the combined-peril dataset.
    #[must_use]
    pub fn is_combined(self) -> bool {
        self == Self::Combined
    }

    /// Peril grouping used in the remote product folder name.
    #[must_use]
    pub fn peril_kind(self) -> &'static str {
        if self.is_combined() {
            "Combined"
        } else {
            "Individual"
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TargetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| TargetError::InvalidCategory {
                value: value.to_string(),
            })
    }
}
