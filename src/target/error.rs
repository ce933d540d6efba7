//! Error types for target resolution.
//!
//! Every variant here is a configuration problem detected before any
//! download is attempted.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating a batch request or preparing its layout.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The flood category is not one of the published datasets.
    #[error("invalid flood type '{value}': expected one of Pluvial, Fluvial, Combined")]
    InvalidCategory {
        /// The rejected value.
        value: String,
    },

    /// No frequencies were requested.
    #[error("at least one frequency is required")]
    NoFrequencies,

    /// The tile list is empty.
    #[error("at least one tile is required")]
    NoTiles,

    /// The dataset code is empty.
    #[error("dataset code must not be empty")]
    EmptyCode,

    /// A frequency or tile would not form a single path component.
    #[error("invalid {field} '{value}': must be a non-empty name without path separators")]
    InvalidComponent {
        /// Which request field was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The download endpoint override is not a usable http(s) URL.
    #[error("invalid download endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl TargetError {
    /// Creates an invalid-component error.
    pub fn invalid_component(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidComponent {
            field,
            value: value.into(),
        }
    }

    /// Creates an invalid-endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}
