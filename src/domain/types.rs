//! Type-safe wrappers using new-type pattern
//!
//! Validated wrappers for the few string inputs that cross into external
//! services: timestamp authority URLs and certificate thumbprints.

use crate::infra::error::{SigningError, SigningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm requested from the signing service.
///
/// SHA-256 is the only algorithm the workflow ever asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Name as accepted by `Set-AuthenticodeSignature -HashAlgorithm`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimestampUrl(String);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    pub fn new(url: impl AsRef<str>) -> SigningResult<Self> {
        let url = url.as_ref().trim();
        Self::validate_url(url)?;
        Ok(TimestampUrl(url.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_url(url: &str) -> SigningResult<()> {
        let Some(rest) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        else {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL must start with http:// or https://, got: {url}"
            )));
        };

        let host = rest.split(['/', ':', '?']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(SigningError::ValidationError(
                "Timestamp URL has no host".to_string(),
            ));
        }

        if host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL points at the local machine: {url}"
            )));
        }

        if !host.contains('.') {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL must contain a valid domain: {url}"
            )));
        }

        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TimestampUrl {
    type Error = SigningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimestampUrl> for String {
    fn from(url: TimestampUrl) -> Self {
        url.0
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Certificate fingerprint as shown by the Windows certificate stores.
///
/// Always 40 upper-case hex digits (SHA-1 of the DER encoding). Spaces and
/// colons are accepted on input so values pasted from the certificate dialog work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Thumbprint(String);

impl Thumbprint {
    pub const LEN: usize = 40;

    pub fn new(value: impl AsRef<str>) -> SigningResult<Self> {
        let normalized: String = value
            .as_ref()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect::<String>()
            .to_ascii_uppercase();

        if normalized.len() != Self::LEN || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SigningError::ValidationError(format!(
                "Thumbprint must be {} hex digits, got: {}",
                Self::LEN,
                value.as_ref()
            )));
        }

        Ok(Thumbprint(normalized))
    }

    /// Build from raw digest bytes.
    pub fn from_digest(digest: &[u8]) -> SigningResult<Self> {
        Self::new(hex::encode_upper(digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Thumbprint {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Thumbprint {
    type Error = SigningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Thumbprint> for String {
    fn from(thumbprint: Thumbprint) -> Self {
        thumbprint.0
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
