//! Machine-wide trust stores and installation outcomes.

use crate::domain::types::Thumbprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-wide store a public certificate can be installed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustStoreName {
    /// `Cert:\LocalMachine\TrustedPublisher`
    TrustedPublisher,
    /// `Cert:\LocalMachine\Root`
    Root,
}

impl TrustStoreName {
    /// Store name as understood by `X509Store`.
    #[must_use]
    pub fn store_name(&self) -> &'static str {
        match self {
            TrustStoreName::TrustedPublisher => "TrustedPublisher",
            TrustStoreName::Root => "Root",
        }
    }
}

impl fmt::Display for TrustStoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of installing a certificate. `AlreadyTrusted` is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallResult {
    Installed,
    AlreadyTrusted,
}

/// Per-store outcomes of one install call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub thumbprint: Thumbprint,
    pub subject: String,
    pub stores: Vec<(TrustStoreName, InstallResult)>,
}

impl InstallReport {
    /// `Installed` if any store changed, otherwise `AlreadyTrusted`.
    #[must_use]
    pub fn result(&self) -> InstallResult {
        if self
            .stores
            .iter()
            .any(|(_, result)| *result == InstallResult::Installed)
        {
            InstallResult::Installed
        } else {
            InstallResult::AlreadyTrusted
        }
    }
}
