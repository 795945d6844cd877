//! Signature state as re-read from a file after signing.

use crate::domain::types::Thumbprint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Status of an Authenticode signature, mirroring `Get-AuthenticodeSignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    Valid,
    NotSigned,
    HashMismatch,
    /// Signature is intact but the signer does not chain to a trusted root.
    NotTrusted,
    NotSupportedFileFormat,
    Incompatible,
    UnknownError,
}

impl SignatureStatus {
    /// Map the host's status name; unrecognized names become `UnknownError`.
    #[must_use]
    pub fn from_host(name: &str) -> Self {
        match name {
            "Valid" => Self::Valid,
            "NotSigned" => Self::NotSigned,
            "HashMismatch" => Self::HashMismatch,
            "NotTrusted" => Self::NotTrusted,
            "NotSupportedFileFormat" => Self::NotSupportedFileFormat,
            "Incompatible" => Self::Incompatible,
            _ => Self::UnknownError,
        }
    }

    /// A signature block is present and matches the file contents.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Valid | Self::NotTrusted)
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of reading the signature back from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureReport {
    pub path: PathBuf,
    pub status: SignatureStatus,
    pub status_message: String,
    pub signer: Option<Thumbprint>,
    pub timestamped: bool,
}

impl SignatureReport {
    /// True when the signature is intact and was produced by `thumbprint`.
    #[must_use]
    pub fn is_signed_by(&self, thumbprint: &Thumbprint) -> bool {
        self.status.is_intact() && self.signer.as_ref() == Some(thumbprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SignatureStatus::from_host("Valid"), SignatureStatus::Valid);
        assert_eq!(SignatureStatus::from_host("NotSigned"), SignatureStatus::NotSigned);
        assert_eq!(SignatureStatus::from_host("Bogus"), SignatureStatus::UnknownError);
        assert!(SignatureStatus::NotTrusted.is_intact());
        assert!(!SignatureStatus::HashMismatch.is_intact());
    }

    #[test]
    fn test_is_signed_by_requires_matching_signer() {
        let ours = Thumbprint::new("A".repeat(40)).unwrap();
        let theirs = Thumbprint::new("B".repeat(40)).unwrap();
        let report = SignatureReport {
            path: PathBuf::from("a.ps1"),
            status: SignatureStatus::Valid,
            status_message: "Signature verified.".to_string(),
            signer: Some(ours.clone()),
            timestamped: false,
        };
        assert!(report.is_signed_by(&ours));
        assert!(!report.is_signed_by(&theirs));
    }
}
