//! Opaque session credential sent with every request.

use std::fmt;

use reqwest::header::HeaderValue;
use thiserror::Error;

/// Errors raised when a credential cannot be used as a header.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credential is empty or whitespace.
    #[error("credential must not be empty")]
    Empty,

    /// The credential contains characters not allowed in an HTTP header.
    #[error("credential contains characters not allowed in an HTTP header")]
    InvalidHeader,
}

/// Session cookie string attached to every download request.
///
/// Read-only once created. The value is marked sensitive and never appears
/// in `Debug` output or logs.
#[derive(Clone)]
pub struct Credential {
    header: HeaderValue,
}

impl Credential {
    /// Wraps a raw cookie string.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the value is empty or not a valid
    /// header value.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CredentialError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CredentialError::Empty);
        }
        let mut header = HeaderValue::from_str(trimmed).map_err(|_| CredentialError::InvalidHeader)?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    /// Header value for the `Cookie` header.
    #[must_use]
    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
