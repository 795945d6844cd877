//! Script-to-executable packaging request and pass-through metadata.

use crate::infra::error::{SigningError, SigningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Target architecture of the produced executable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    Any,
    X86,
    X64,
}

impl FromStr for Architecture {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "anycpu" => Ok(Architecture::Any),
            "x86" => Ok(Architecture::X86),
            "x64" => Ok(Architecture::X64),
            other => Err(SigningError::ValidationError(format!(
                "Unknown architecture '{other}'. Expected any, x86 or x64"
            ))),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::Any => "any",
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
        };
        f.write_str(name)
    }
}

/// Metadata passed verbatim to the packaging service.
///
/// Only blank-but-present text fields are rejected; values are otherwise not
/// interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingMetadata {
    pub icon_path: Option<PathBuf>,
    pub product_name: Option<String>,
    pub company: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub copyright: Option<String>,
    /// Build a windowed executable without a console.
    pub hide_console: bool,
    /// Embed a manifest requesting elevation.
    pub require_admin: bool,
    pub architecture: Architecture,
}

impl PackagingMetadata {
    pub fn validate(&self) -> SigningResult<()> {
        let text_fields = [
            ("product_name", &self.product_name),
            ("company", &self.company),
            ("version", &self.version),
            ("description", &self.description),
            ("copyright", &self.copyright),
        ];
        for (name, value) in text_fields {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(SigningError::ValidationError(format!(
                    "Packaging field '{name}' is present but empty"
                )));
            }
        }

        if self
            .icon_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(SigningError::ValidationError(
                "Packaging field 'icon_path' is present but empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// A single conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingRequest {
    pub script_path: PathBuf,
    pub output_path: PathBuf,
    pub metadata: PackagingMetadata,
    /// Replace an existing file at `output_path`.
    pub overwrite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_parsing() {
        assert_eq!("x64".parse::<Architecture>().unwrap(), Architecture::X64);
        assert_eq!("X86".parse::<Architecture>().unwrap(), Architecture::X86);
        assert_eq!("AnyCPU".parse::<Architecture>().unwrap(), Architecture::Any);
        assert!("arm64".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_metadata_rejects_blank_fields() {
        let metadata = PackagingMetadata {
            company: Some("   ".to_string()),
            ..Default::default()
        };
        let err = metadata.validate().unwrap_err();
        assert!(err.to_string().contains("company"));
    }

    #[test]
    fn test_metadata_accepts_free_form_values() {
        let metadata = PackagingMetadata {
            product_name: Some("Report Tool".to_string()),
            version: Some("not-a-semver".to_string()),
            icon_path: Some(PathBuf::from("missing.ico")),
            ..Default::default()
        };
        assert!(metadata.validate().is_ok());
    }
}
