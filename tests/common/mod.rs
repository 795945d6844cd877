//! In-memory collaborators for workflow integration tests.
//!
//! Each fake records what it was asked to do so tests can assert that a
//! rejected operation never reached its service.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use script_signer::adapters::backend::{
    IdentityStore, PackagingService, ProcessSupervisor, SignRequest, SigningService, TrustStore,
};
use script_signer::domain::certificate::CertificateFile;
use script_signer::domain::identity::CertificateEntry;
use script_signer::domain::packaging::PackagingRequest;
use script_signer::domain::trust::TrustStoreName;
use script_signer::domain::verification::{SignatureReport, SignatureStatus};
use script_signer::infra::error::{PackagingFailureKind, SigningError, SigningResult};
use script_signer::{Thumbprint, WorkflowController, WorkflowServices, WorkflowSettings};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEV_CERT_THUMBPRINT: &str = "E0C934926E8AA87D18CDD1592F849CA40ED640C1";
pub const EXPIRED_THUMBPRINT: &str = "0123456789ABCDEF0123456789ABCDEF01234567";
pub const DOCUMENT_THUMBPRINT: &str = "FEDCBA9876543210FEDCBA9876543210FEDCBA98";

pub fn thumbprint(value: &str) -> Thumbprint {
    Thumbprint::new(value).unwrap()
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// "Dev Cert" (valid), "Old Cert" (expired) and a document-signing
/// certificate without the code-signing usage.
pub fn standard_entries() -> Vec<CertificateEntry> {
    vec![
        CertificateEntry {
            thumbprint: thumbprint(DEV_CERT_THUMBPRINT),
            subject: "CN=Dev Cert".to_string(),
            not_after: Utc::now() + ChronoDuration::days(365),
            code_signing: true,
            has_private_key: true,
        },
        CertificateEntry {
            thumbprint: thumbprint(EXPIRED_THUMBPRINT),
            subject: "CN=Old Cert".to_string(),
            not_after: Utc::now() - ChronoDuration::days(3),
            code_signing: true,
            has_private_key: true,
        },
        CertificateEntry {
            thumbprint: thumbprint(DOCUMENT_THUMBPRINT),
            subject: "CN=Documents".to_string(),
            not_after: Utc::now() + ChronoDuration::days(365),
            code_signing: false,
            has_private_key: true,
        },
    ]
}

#[derive(Default)]
pub struct FakeSigningService {
    pub requests: Mutex<Vec<SignRequest>>,
    signatures: Mutex<HashMap<PathBuf, (Thumbprint, bool)>>,
    /// Report this status on verify instead of `Valid`.
    pub verify_status: Mutex<Option<SignatureStatus>>,
    /// Report this signer on verify instead of the one that signed.
    pub verify_signer: Mutex<Option<Thumbprint>>,
    /// Sleep this long inside `sign`.
    pub sign_delay: Mutex<Option<Duration>>,
}

impl FakeSigningService {
    pub fn sign_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SigningService for FakeSigningService {
    async fn sign(&self, request: &SignRequest) -> SigningResult<()> {
        let delay = *self.sign_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(request.clone());

        if !request.identity.is_valid() {
            return Err(SigningError::IdentityExpired(request.identity.to_string()));
        }
        if !request.path.is_file() {
            return Err(SigningError::SigningServiceFailure(format!(
                "cannot open {}",
                request.path.display()
            )));
        }

        self.signatures.lock().unwrap().insert(
            request.path.clone(),
            (
                request.identity.thumbprint().clone(),
                request.timestamp_url.is_some(),
            ),
        );
        Ok(())
    }

    async fn verify(&self, path: &Path) -> SigningResult<SignatureReport> {
        let signed = self.signatures.lock().unwrap().get(path).cloned();
        let status_override = *self.verify_status.lock().unwrap();
        let signer_override = self.verify_signer.lock().unwrap().clone();

        let report = match signed {
            Some((signer, timestamped)) => SignatureReport {
                path: path.to_path_buf(),
                status: status_override.unwrap_or(SignatureStatus::Valid),
                status_message: "Signature verified.".to_string(),
                signer: Some(signer_override.unwrap_or(signer)),
                timestamped,
            },
            None => SignatureReport {
                path: path.to_path_buf(),
                status: SignatureStatus::NotSigned,
                status_message: "The file is not digitally signed.".to_string(),
                signer: None,
                timestamped: false,
            },
        };
        Ok(report)
    }
}

/// Copies the script bytes to the output path, all-or-nothing.
#[derive(Default)]
pub struct FakePackagingService {
    pub requests: Mutex<Vec<PackagingRequest>>,
    pub fail_with: Mutex<Option<PackagingFailureKind>>,
}

impl FakePackagingService {
    pub fn package_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PackagingService for FakePackagingService {
    async fn package(&self, request: &PackagingRequest) -> SigningResult<PathBuf> {
        self.requests.lock().unwrap().push(request.clone());
        let failure = *self.fail_with.lock().unwrap();
        if let Some(kind) = failure {
            return Err(SigningError::packaging(kind, "simulated failure"));
        }
        if request.output_path.exists() && !request.overwrite {
            return Err(SigningError::packaging(
                PackagingFailureKind::OutputCollision,
                "output exists",
            ));
        }
        let script = std::fs::read(&request.script_path)?;
        let mut image = b"MZ".to_vec();
        image.extend_from_slice(&script);
        std::fs::write(&request.output_path, image)?;
        Ok(request.output_path.clone())
    }
}

pub struct FakeIdentityStore {
    pub entries: Mutex<Vec<CertificateEntry>>,
}

impl FakeIdentityStore {
    pub fn new(entries: Vec<CertificateEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl IdentityStore for FakeIdentityStore {
    async fn list(&self) -> SigningResult<Vec<CertificateEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeTrustStore {
    pub elevated: AtomicBool,
    pub entries: Mutex<HashSet<(TrustStoreName, Thumbprint)>>,
    pub adds: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl FakeTrustStore {
    pub fn elevated() -> Self {
        let store = Self::default();
        store.elevated.store(true, Ordering::SeqCst);
        store
    }

    pub fn snapshot(&self) -> HashSet<(TrustStoreName, Thumbprint)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrustStore for FakeTrustStore {
    async fn is_elevated(&self) -> SigningResult<bool> {
        Ok(self.elevated.load(Ordering::SeqCst))
    }

    async fn contains(&self, store: TrustStoreName, thumbprint: &Thumbprint) -> SigningResult<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .contains(&(store, thumbprint.clone())))
    }

    async fn add(&self, store: TrustStoreName, certificate: &CertificateFile) -> SigningResult<()> {
        if !self.elevated.load(Ordering::SeqCst) {
            return Err(SigningError::InsufficientPrivilege("access denied".to_string()));
        }
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert((store, certificate.thumbprint().clone()));
        Ok(())
    }
}

/// A companion process that may or may not come up when launched.
#[derive(Default)]
pub struct FakeProcessSupervisor {
    pub running: AtomicBool,
    pub starts_on_launch: AtomicBool,
    pub launches: AtomicUsize,
}

#[async_trait]
impl ProcessSupervisor for FakeProcessSupervisor {
    async fn is_running(&self, _process_name: &str) -> SigningResult<bool> {
        Ok(self.running.load(Ordering::SeqCst))
    }

    async fn launch(&self, _executable: &Path) -> SigningResult<()> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.starts_on_launch.load(Ordering::SeqCst) {
            self.running.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A controller wired to fakes, with handles to inspect them.
pub struct Harness {
    pub controller: WorkflowController,
    pub signing: Arc<FakeSigningService>,
    pub packaging: Arc<FakePackagingService>,
    pub identities: Arc<FakeIdentityStore>,
    pub processes: Arc<FakeProcessSupervisor>,
}

impl Harness {
    pub fn new() -> Self {
        let mut settings = WorkflowSettings::default();
        settings.cloud_session.settle_delay = Duration::from_millis(1);
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: WorkflowSettings) -> Self {
        let signing = Arc::new(FakeSigningService::default());
        let packaging = Arc::new(FakePackagingService::default());
        let identities = Arc::new(FakeIdentityStore::new(standard_entries()));
        let processes = Arc::new(FakeProcessSupervisor::default());

        let services = WorkflowServices {
            signing: signing.clone(),
            packaging: packaging.clone(),
            identities: identities.clone(),
            processes: processes.clone(),
        };

        Self {
            controller: WorkflowController::new(services, settings),
            signing,
            packaging,
            identities,
            processes,
        }
    }
}
