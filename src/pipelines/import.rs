//! `ImportWorkflow`: the certificate-import entry point.
//!
//! Locates the trust bundle by its fixed file name, installs it through
//! [`TrustStoreInstaller`] and condenses the result into an exit code and
//! one machine-readable JSON line.

use crate::{
    domain::certificate::CertificateFile,
    domain::trust::{InstallReport, InstallResult},
    infra::error::{ErrorKind, SigningError},
    services::trust_installer::TrustStoreInstaller,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// File name of the public certificate shipped in the trust bundle.
pub const CERTIFICATE_FILE_NAME: &str = "CodeSigningCertificate.cer";

/// Process exit codes of the import entry point.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CERTIFICATE_UNAVAILABLE: i32 = 2;
    pub const INSUFFICIENT_PRIVILEGE: i32 = 3;
}

/// Result line printed on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Installed { certificate: PathBuf, report: InstallReport },
    AlreadyTrusted { certificate: PathBuf, report: InstallReport },
    /// The bundled certificate is missing or cannot be parsed.
    CertificateUnavailable {
        certificate: Option<PathBuf>,
        message: String,
    },
    /// The certificate was read but installing it failed.
    Failed { kind: ErrorKind, message: String },
}

impl ImportOutcome {
    fn from_error(error: &SigningError) -> Self {
        ImportOutcome::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ImportOutcome::Installed { .. } | ImportOutcome::AlreadyTrusted { .. } => {
                exit_code::SUCCESS
            }
            ImportOutcome::CertificateUnavailable { .. } => exit_code::CERTIFICATE_UNAVAILABLE,
            ImportOutcome::Failed {
                kind: ErrorKind::InsufficientPrivilege,
                ..
            } => exit_code::INSUFFICIENT_PRIVILEGE,
            ImportOutcome::Failed { .. } => exit_code::FAILURE,
        }
    }

    /// Single-line JSON rendering.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"failed","kind":"InvalidInput","message":"{e}"}}"#)
        })
    }
}

/// Find the certificate next to the executable, else in the working directory.
#[must_use]
pub fn resolve_certificate(executable_dir: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
    executable_dir
        .into_iter()
        .chain(std::iter::once(working_dir))
        .map(|dir| dir.join(CERTIFICATE_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Orchestrates locating and installing the bundled certificate.
pub struct ImportWorkflow {
    installer: TrustStoreInstaller,
}

impl ImportWorkflow {
    #[must_use]
    pub fn new(installer: TrustStoreInstaller) -> Self {
        Self { installer }
    }

    /// Run the import. Never fails; errors are folded into the outcome.
    pub async fn run(&self, executable_dir: Option<&Path>, working_dir: &Path) -> ImportOutcome {
        let Some(certificate) = resolve_certificate(executable_dir, working_dir) else {
            let message = format!(
                "{CERTIFICATE_FILE_NAME} not found next to the executable or in {}",
                working_dir.display()
            );
            log::error!("{message}");
            return ImportOutcome::CertificateUnavailable {
                certificate: None,
                message,
            };
        };

        log::info!("Importing {}", certificate.display());
        let parsed = match CertificateFile::read(&certificate) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::error!("{error}");
                return ImportOutcome::CertificateUnavailable {
                    certificate: Some(certificate),
                    message: error.to_string(),
                };
            }
        };

        match self.installer.install_certificate(&parsed).await {
            Ok(report) => match report.result() {
                InstallResult::Installed => ImportOutcome::Installed {
                    certificate,
                    report,
                },
                InstallResult::AlreadyTrusted => ImportOutcome::AlreadyTrusted {
                    certificate,
                    report,
                },
            },
            Err(error) => {
                log::error!("Import failed: {error}");
                if error.kind() == ErrorKind::InsufficientPrivilege {
                    log::error!("Re-run from an elevated session");
                }
                ImportOutcome::from_error(&error)
            }
        }
    }
}
