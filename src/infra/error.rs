//! Error types for signing, packaging and trust-store operations.
//! Every failure is recovered at the operation boundary and reported as a kind plus message.

use crate::domain::artifact::ArtifactKind;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for workflow operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Why a script-to-executable conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingFailureKind {
    /// The converter module is not installed on the host.
    BackendMissing,
    /// The script does not parse.
    InvalidScript,
    /// The target executable already exists and overwriting is disabled.
    OutputCollision,
    /// The converter ran but the executable could not be produced.
    WriteFailure,
}

impl fmt::Display for PackagingFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BackendMissing => "backend missing",
            Self::InvalidScript => "invalid script",
            Self::OutputCollision => "output collision",
            Self::WriteFailure => "write failure",
        };
        f.write_str(name)
    }
}

/// Comprehensive error types for workflow operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("No artifact selected: {0}")]
    NoArtifactSelected(String),

    #[error("Artifact type mismatch: expected {expected}, found {found} ({})", path.display())]
    ArtifactTypeMismatch {
        expected: ArtifactKind,
        found: ArtifactKind,
        path: PathBuf,
    },

    #[error("No signing identity selected")]
    NoIdentitySelected,

    #[error("Signing identity expired: {0}")]
    IdentityExpired(String),

    #[error("Signing identity not found: {0}")]
    IdentityNotFound(String),

    #[error("Signing service failure: {0}")]
    SigningServiceFailure(String),

    #[error("Packaging service failure ({kind}): {message}")]
    PackagingServiceFailure {
        kind: PackagingFailureKind,
        message: String,
    },

    #[error("Insufficient privilege: {0}")]
    #[diagnostic(help("re-run the command from an elevated (administrator) session"))]
    InsufficientPrivilege(String),

    #[error("Cloud signing session failure: {0}")]
    CloudSessionFailure(String),

    #[error("{service} did not respond within {}s", timeout.as_secs())]
    ServiceUnresponsive {
        service: &'static str,
        timeout: Duration,
    },

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Flat classification of [`SigningError`] for structured reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    NoArtifactSelected,
    ArtifactTypeMismatch,
    NoIdentitySelected,
    IdentityExpired,
    IdentityNotFound,
    SigningServiceFailure,
    PackagingServiceFailure,
    InsufficientPrivilege,
    CloudSessionFailure,
    ServiceUnresponsive,
    CertificateError,
    IoError,
    InvalidInput,
    ValidationError,
    ConfigurationError,
}

impl SigningError {
    /// Build a packaging failure of the given kind.
    pub fn packaging(kind: PackagingFailureKind, message: impl Into<String>) -> Self {
        Self::PackagingServiceFailure {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoArtifactSelected(_) => ErrorKind::NoArtifactSelected,
            Self::ArtifactTypeMismatch { .. } => ErrorKind::ArtifactTypeMismatch,
            Self::NoIdentitySelected => ErrorKind::NoIdentitySelected,
            Self::IdentityExpired(_) => ErrorKind::IdentityExpired,
            Self::IdentityNotFound(_) => ErrorKind::IdentityNotFound,
            Self::SigningServiceFailure(_) => ErrorKind::SigningServiceFailure,
            Self::PackagingServiceFailure { .. } => ErrorKind::PackagingServiceFailure,
            Self::InsufficientPrivilege(_) => ErrorKind::InsufficientPrivilege,
            Self::CloudSessionFailure(_) => ErrorKind::CloudSessionFailure,
            Self::ServiceUnresponsive { .. } => ErrorKind::ServiceUnresponsive,
            Self::CertificateError(_) => ErrorKind::CertificateError,
            Self::IoError(_) => ErrorKind::IoError,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ValidationError(_) => ErrorKind::ValidationError,
            Self::ConfigurationError(_) => ErrorKind::ConfigurationError,
        }
    }

    /// The packaging sub-kind, if this is a packaging failure.
    #[must_use]
    pub fn packaging_kind(&self) -> Option<PackagingFailureKind> {
        match self {
            Self::PackagingServiceFailure { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::CertificateError(error.to_string())
    }
}

impl From<serde_json::Error> for SigningError {
    fn from(error: serde_json::Error) -> Self {
        SigningError::InvalidInput(format!("Malformed JSON from host: {error}"))
    }
}
