//! Idempotent installation of a public certificate into machine-wide stores.

use crate::adapters::backend::TrustStore;
use crate::domain::certificate::CertificateFile;
use crate::domain::trust::{InstallReport, InstallResult, TrustStoreName};
use crate::infra::error::{SigningError, SigningResult};
use crate::infra::timeout::{with_timeout, DEFAULT_SERVICE_TIMEOUT_SECONDS};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Installs a certificate into each configured store, skipping stores that
/// already hold it.
pub struct TrustStoreInstaller {
    store: Arc<dyn TrustStore>,
    targets: Vec<TrustStoreName>,
    timeout: Duration,
}

impl TrustStoreInstaller {
    #[must_use]
    pub fn new(store: Arc<dyn TrustStore>, targets: Vec<TrustStoreName>) -> Self {
        Self {
            store,
            targets,
            timeout: Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn targets(&self) -> &[TrustStoreName] {
        &self.targets
    }

    /// Read a DER or PEM certificate from disk and install it.
    ///
    /// # Errors
    ///
    /// `IoError`/`CertificateError` for an unreadable file, otherwise as
    /// [`TrustStoreInstaller::install_certificate`].
    pub async fn install(&self, certificate_path: &Path) -> SigningResult<InstallReport> {
        let certificate = CertificateFile::read(certificate_path)?;
        self.install_certificate(&certificate).await
    }

    /// Install into every target store. Safe to repeat: a store already
    /// holding the thumbprint is reported `AlreadyTrusted` and left alone.
    ///
    /// # Errors
    ///
    /// `InsufficientPrivilege` before any store is touched when not elevated,
    /// or the store's own error.
    pub async fn install_certificate(
        &self,
        certificate: &CertificateFile,
    ) -> SigningResult<InstallReport> {
        if self.targets.is_empty() {
            return Err(SigningError::InvalidInput(
                "no trust stores configured".to_string(),
            ));
        }

        let elevated = with_timeout("trust store", self.timeout, self.store.is_elevated()).await?;
        if !elevated {
            return Err(SigningError::InsufficientPrivilege(
                "installing into machine-wide trust stores requires an elevated session"
                    .to_string(),
            ));
        }

        let thumbprint = certificate.thumbprint();
        let mut stores = Vec::with_capacity(self.targets.len());
        for &target in &self.targets {
            let present = with_timeout(
                "trust store",
                self.timeout,
                self.store.contains(target, thumbprint),
            )
            .await?;

            let result = if present {
                log::info!("{thumbprint} is already in the {target} store");
                InstallResult::AlreadyTrusted
            } else {
                with_timeout("trust store", self.timeout, self.store.add(target, certificate))
                    .await?;
                log::info!("Installed {thumbprint} into the {target} store");
                InstallResult::Installed
            };
            stores.push((target, result));
        }

        Ok(InstallReport {
            thumbprint: thumbprint.clone(),
            subject: certificate.subject().to_string(),
            stores,
        })
    }
}
