//! Collaborator traits for everything the workflow delegates.
//!
//! The workflow core never signs, packages or touches a certificate store
//! itself. It talks to these traits:
//! - [`SigningService`] applies and re-reads Authenticode signatures
//! - [`PackagingService`] converts a script into an executable
//! - [`IdentityStore`] enumerates certificates available for signing
//! - [`TrustStore`] looks up and adds certificates in machine-wide stores
//! - [`ProcessSupervisor`] checks for and launches the cloud-signing companion
//!
//! Production implementations live in [`crate::adapters::powershell`].

use crate::domain::certificate::CertificateFile;
use crate::domain::identity::{CertificateEntry, SigningIdentity};
use crate::domain::packaging::PackagingRequest;
use crate::domain::trust::TrustStoreName;
use crate::domain::types::{HashAlgorithm, Thumbprint, TimestampUrl};
use crate::domain::verification::SignatureReport;
use crate::infra::error::SigningResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Parameters handed to the signing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub path: PathBuf,
    pub identity: SigningIdentity,
    pub hash_algorithm: HashAlgorithm,
    /// Counter-sign with this timestamp authority when present.
    pub timestamp_url: Option<TimestampUrl>,
}

impl SignRequest {
    /// Request with the fixed SHA-256 digest policy.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        identity: SigningIdentity,
        timestamp_url: Option<TimestampUrl>,
    ) -> Self {
        Self {
            path: path.into(),
            identity,
            hash_algorithm: HashAlgorithm::Sha256,
            timestamp_url,
        }
    }
}

/// Applies and verifies Authenticode signatures.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Append a signature block to the file, or fail leaving it untouched.
    ///
    /// # Errors
    ///
    /// Returns `SigningServiceFailure` (or `IdentityExpired`) with the
    /// underlying message.
    async fn sign(&self, request: &SignRequest) -> SigningResult<()>;

    /// Re-read the signature currently embedded in `path`.
    ///
    /// # Errors
    ///
    /// Returns `SigningServiceFailure` if the file cannot be inspected.
    async fn verify(&self, path: &Path) -> SigningResult<SignatureReport>;
}

/// Converts a script into a native executable.
#[async_trait]
pub trait PackagingService: Send + Sync {
    /// Produce the executable and return its path.
    ///
    /// All-or-nothing: on failure no file is left at the output path.
    ///
    /// # Errors
    ///
    /// Returns `PackagingServiceFailure` with the matching failure kind.
    async fn package(&self, request: &PackagingRequest) -> SigningResult<PathBuf>;
}

/// Enumerates certificates the current user could sign with.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// All candidate certificates, expired ones included.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    async fn list(&self) -> SigningResult<Vec<CertificateEntry>>;
}

/// Machine-wide certificate trust lists.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Whether the caller may modify machine-wide stores.
    ///
    /// # Errors
    ///
    /// Returns error if the privilege level cannot be determined.
    async fn is_elevated(&self) -> SigningResult<bool>;

    /// Whether `store` holds a certificate with this fingerprint.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened.
    async fn contains(&self, store: TrustStoreName, thumbprint: &Thumbprint)
        -> SigningResult<bool>;

    /// Add the certificate to `store`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPrivilege` or a store error.
    async fn add(&self, store: TrustStoreName, certificate: &CertificateFile) -> SigningResult<()>;
}

/// Best-effort supervision of an external desktop process.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Whether a process with this name is running.
    ///
    /// # Errors
    ///
    /// Returns error if the process list cannot be read.
    async fn is_running(&self, process_name: &str) -> SigningResult<bool>;

    /// Start `executable` detached from the caller.
    ///
    /// # Errors
    ///
    /// Returns `CloudSessionFailure` if the process cannot be started.
    async fn launch(&self, executable: &Path) -> SigningResult<()>;
}
