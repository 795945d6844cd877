//! The signing workflow controller.
//!
//! Owns the workflow state (selected artifact, selected identity, user
//! toggles) and orchestrates the four operations by delegating to the
//! collaborator traits. Every operation is gated by [`ensure_permitted`]
//! before anything is delegated, and every delegated call is bounded by the
//! configured service timeout.

use crate::adapters::backend::{
    IdentityStore, PackagingService, ProcessSupervisor, SignRequest, SigningService,
};
use crate::domain::artifact::ArtifactReference;
use crate::domain::identity::SigningIdentity;
use crate::domain::packaging::{PackagingMetadata, PackagingRequest};
use crate::domain::permissions::{Operation, WorkflowPermissions};
use crate::domain::session::{CloudSessionSettings, CloudSessionStatus};
use crate::domain::types::{Thumbprint, TimestampUrl};
use crate::domain::verification::SignatureReport;
use crate::infra::error::{PackagingFailureKind, SigningError, SigningResult};
use crate::infra::timeout::{with_timeout, DEFAULT_SERVICE_TIMEOUT_SECONDS};
use crate::services::identity::IdentityCatalog;
use crate::services::permissions::{compute_permissions, ensure_permitted};
use crate::services::selector::ArtifactSelector;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// External collaborators the controller delegates to.
#[derive(Clone)]
pub struct WorkflowServices {
    pub signing: Arc<dyn SigningService>,
    pub packaging: Arc<dyn PackagingService>,
    pub identities: Arc<dyn IdentityStore>,
    pub processes: Arc<dyn ProcessSupervisor>,
}

/// User-controlled settings that shape each operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Counter-sign with `timestamp_url` when both are set.
    pub timestamping: bool,
    pub timestamp_url: Option<TimestampUrl>,
    pub packaging: PackagingMetadata,
    /// Replace an existing executable when converting.
    pub overwrite_output: bool,
    pub cloud_session: CloudSessionSettings,
    pub service_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            timestamping: true,
            timestamp_url: TimestampUrl::new("http://timestamp.digicert.com").ok(),
            packaging: PackagingMetadata::default(),
            overwrite_output: false,
            cloud_session: CloudSessionSettings::default(),
            service_timeout: Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECONDS),
        }
    }
}

/// A signature that was applied and then read back from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignOutcome {
    pub path: PathBuf,
    pub signer: Thumbprint,
    pub timestamp_url: Option<TimestampUrl>,
    pub report: SignatureReport,
}

/// Single-user workflow state plus the operations over it.
///
/// Operations take `&mut self`, so one controller runs one operation at a
/// time.
pub struct WorkflowController {
    services: WorkflowServices,
    settings: WorkflowSettings,
    selector: ArtifactSelector,
    catalog: IdentityCatalog,
    identity: Option<SigningIdentity>,
}

impl WorkflowController {
    #[must_use]
    pub fn new(services: WorkflowServices, settings: WorkflowSettings) -> Self {
        let catalog = IdentityCatalog::new(services.identities.clone())
            .with_timeout(settings.service_timeout);
        Self {
            services,
            settings,
            selector: ArtifactSelector::new(),
            catalog,
            identity: None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn select_path(&mut self, path: impl AsRef<Path>) -> &ArtifactReference {
        self.selector.select_path(path)
    }

    #[must_use]
    pub fn current(&self) -> Option<&ArtifactReference> {
        self.selector.current()
    }

    /// Re-enumerate signing identities from the identity store.
    ///
    /// The current selection is kept even if it is no longer listed; the
    /// signing service has the final say.
    ///
    /// # Errors
    ///
    /// Returns the store's error or `ServiceUnresponsive`.
    pub async fn refresh_identities(&mut self) -> SigningResult<&[SigningIdentity]> {
        self.catalog.refresh().await
    }

    #[must_use]
    pub fn identities(&self) -> &[SigningIdentity] {
        self.catalog.list()
    }

    /// Select an identity directly. Expired identities are accepted here and
    /// rejected when signing.
    pub fn select_identity(&mut self, identity: SigningIdentity) {
        if !identity.is_valid() {
            log::warn!("Selected identity {identity} has expired");
        }
        self.identity = Some(identity);
    }

    /// Select an identity from the last refresh.
    ///
    /// # Errors
    ///
    /// Returns `IdentityNotFound` if the thumbprint was not listed.
    pub fn select_identity_by_thumbprint(
        &mut self,
        thumbprint: &Thumbprint,
    ) -> SigningResult<&SigningIdentity> {
        let identity = self
            .catalog
            .find(thumbprint)
            .cloned()
            .ok_or_else(|| SigningError::IdentityNotFound(thumbprint.to_string()))?;
        if !identity.is_valid() {
            log::warn!("Selected identity {identity} has expired");
        }
        Ok(&*self.identity.insert(identity))
    }

    pub fn clear_identity(&mut self) {
        self.identity = None;
    }

    #[must_use]
    pub fn selected_identity(&self) -> Option<&SigningIdentity> {
        self.identity.as_ref()
    }

    pub fn set_timestamping(&mut self, enabled: bool) {
        self.settings.timestamping = enabled;
    }

    /// Currently permitted operations, with file existence re-checked now.
    #[must_use]
    pub fn permissions(&self) -> WorkflowPermissions {
        let artifact = self.selector.current().map(ArtifactReference::refreshed);
        compute_permissions(artifact.as_ref(), self.identity.as_ref())
    }

    /// # Errors
    ///
    /// Permission errors, `IdentityExpired`, `SigningServiceFailure` or
    /// `ServiceUnresponsive`.
    pub async fn sign_script(&mut self) -> SigningResult<SignOutcome> {
        self.sign(Operation::SignScript).await
    }

    /// # Errors
    ///
    /// Permission errors, `IdentityExpired`, `SigningServiceFailure` or
    /// `ServiceUnresponsive`.
    pub async fn sign_executable(&mut self) -> SigningResult<SignOutcome> {
        self.sign(Operation::SignExecutable).await
    }

    /// Package the current script and select the produced executable.
    ///
    /// `output` defaults to the script's directory and stem with an `.exe`
    /// extension.
    ///
    /// # Errors
    ///
    /// Permission errors, `ValidationError` for blank metadata,
    /// `PackagingServiceFailure` or `ServiceUnresponsive`. The selection is
    /// unchanged on failure.
    pub async fn convert_to_executable(
        &mut self,
        output: Option<PathBuf>,
    ) -> SigningResult<&ArtifactReference> {
        let artifact = self.preflight(Operation::ConvertToExecutable)?;
        self.settings.packaging.validate()?;

        let output_path = match output {
            Some(path) => ArtifactReference::probe(path).path().to_path_buf(),
            None => artifact.default_executable_path(),
        };
        if output_path.exists() && !self.settings.overwrite_output {
            return Err(SigningError::packaging(
                PackagingFailureKind::OutputCollision,
                format!("{} already exists", output_path.display()),
            ));
        }

        let request = PackagingRequest {
            script_path: artifact.path().to_path_buf(),
            output_path,
            metadata: self.settings.packaging.clone(),
            overwrite: self.settings.overwrite_output,
        };
        log::info!(
            "Converting {} to {}",
            request.script_path.display(),
            request.output_path.display()
        );

        let produced = with_timeout(
            "packaging service",
            self.settings.service_timeout,
            self.services.packaging.package(&request),
        )
        .await?;

        Ok(self.selector.select_path(produced))
    }

    /// Make sure the cloud-signing companion is running.
    ///
    /// # Errors
    ///
    /// Returns `CloudSessionFailure` if it cannot be launched or is not seen
    /// alive after the configured checks.
    pub async fn manage_cloud_session(&mut self) -> SigningResult<CloudSessionStatus> {
        ensure_permitted(Operation::ManageCloudSession, None, None)?;
        let session = &self.settings.cloud_session;
        let timeout = self.settings.service_timeout;
        let processes = &self.services.processes;

        if with_timeout(
            "process supervisor",
            timeout,
            processes.is_running(&session.process_name),
        )
        .await?
        {
            log::info!("{} is already running", session.process_name);
            return Ok(CloudSessionStatus::AlreadyRunning);
        }

        with_timeout(
            "process supervisor",
            timeout,
            processes.launch(&session.executable),
        )
        .await?;

        for check in 1..=session.checks {
            tokio::time::sleep(session.settle_delay).await;
            if with_timeout(
                "process supervisor",
                timeout,
                processes.is_running(&session.process_name),
            )
            .await?
            {
                log::info!("{} started (check {check})", session.process_name);
                return Ok(CloudSessionStatus::Started);
            }
        }

        Err(SigningError::CloudSessionFailure(format!(
            "{} was launched but is not running after {} check(s)",
            session.process_name, session.checks
        )))
    }

    /// Read the signature currently embedded in the selected artifact.
    ///
    /// # Errors
    ///
    /// `NoArtifactSelected`, `SigningServiceFailure` or `ServiceUnresponsive`.
    pub async fn verify_current(&self) -> SigningResult<SignatureReport> {
        let artifact = self
            .selector
            .current()
            .map(ArtifactReference::refreshed)
            .filter(ArtifactReference::exists)
            .ok_or_else(|| {
                SigningError::NoArtifactSelected("select an existing file to verify".to_string())
            })?;

        with_timeout(
            "signing service",
            self.settings.service_timeout,
            self.services.signing.verify(artifact.path()),
        )
        .await
    }

    /// Refreshed artifact after the permission gate.
    fn preflight(&self, operation: Operation) -> SigningResult<ArtifactReference> {
        let artifact = self.selector.current().map(ArtifactReference::refreshed);
        ensure_permitted(operation, artifact.as_ref(), self.identity.as_ref())?;
        artifact.ok_or_else(|| SigningError::NoArtifactSelected(operation.to_string()))
    }

    async fn sign(&mut self, operation: Operation) -> SigningResult<SignOutcome> {
        let artifact = self.preflight(operation)?;
        let identity = self
            .identity
            .clone()
            .ok_or(SigningError::NoIdentitySelected)?;

        if !identity.is_valid() {
            return Err(SigningError::IdentityExpired(format!(
                "{identity} expired on {}",
                identity.not_after()
            )));
        }

        let timestamp_url = self
            .settings
            .timestamp_url
            .clone()
            .filter(|_| self.settings.timestamping);
        let request = SignRequest::new(artifact.path(), identity, timestamp_url);
        log::info!(
            "Signing {} with {} ({})",
            artifact,
            request.identity,
            request.hash_algorithm
        );

        let timeout = self.settings.service_timeout;
        with_timeout("signing service", timeout, self.services.signing.sign(&request)).await?;
        let report = with_timeout(
            "signing service",
            timeout,
            self.services.signing.verify(&request.path),
        )
        .await?;

        let signer = request.identity.thumbprint();
        if !report.is_signed_by(signer) {
            return Err(SigningError::SigningServiceFailure(format!(
                "signature on {} was not applied by {signer}: {} ({})",
                request.path.display(),
                report.status,
                report.status_message
            )));
        }

        log::info!("Signed {} ({})", request.path.display(), report.status);
        Ok(SignOutcome {
            path: request.path.clone(),
            signer: signer.clone(),
            timestamp_url: request.timestamp_url.clone(),
            report,
        })
    }
}
