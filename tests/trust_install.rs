//! Trust-store installation and the certificate-import entry point.

mod common;

use common::*;
use script_signer::adapters::powershell::{PowerShellHost, PowerShellTrustStore};
use script_signer::domain::trust::{InstallResult, TrustStoreName};
use script_signer::infra::error::ErrorKind;
use script_signer::pipelines::import::{exit_code, ImportOutcome, CERTIFICATE_FILE_NAME};
use script_signer::pipelines::ImportWorkflow;
use script_signer::services::TrustStoreInstaller;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn both_stores() -> Vec<TrustStoreName> {
    vec![TrustStoreName::TrustedPublisher, TrustStoreName::Root]
}

#[tokio::test]
async fn install_is_idempotent() {
    let store = Arc::new(FakeTrustStore::elevated());
    let installer = TrustStoreInstaller::new(store.clone(), both_stores());
    let cert = fixture("dev-signing.cer");

    let first = installer.install(&cert).await.unwrap();
    assert_eq!(first.result(), InstallResult::Installed);
    assert_eq!(first.thumbprint, thumbprint(DEV_CERT_THUMBPRINT));
    let after_first = store.snapshot();
    assert_eq!(after_first.len(), 2);

    let second = installer.install(&cert).await.unwrap();
    assert_eq!(second.result(), InstallResult::AlreadyTrusted);
    assert!(second
        .stores
        .iter()
        .all(|(_, result)| *result == InstallResult::AlreadyTrusted));
    assert_eq!(store.snapshot(), after_first);
    assert_eq!(store.adds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn pem_and_der_install_the_same_certificate() {
    let store = Arc::new(FakeTrustStore::elevated());
    let installer = TrustStoreInstaller::new(store.clone(), vec![TrustStoreName::TrustedPublisher]);

    let der = installer.install(&fixture("dev-signing.cer")).await.unwrap();
    let pem = installer.install(&fixture("dev-signing.pem")).await.unwrap();
    assert_eq!(der.thumbprint, pem.thumbprint);
    assert_eq!(pem.result(), InstallResult::AlreadyTrusted);
}

#[tokio::test]
async fn unelevated_install_fails_before_touching_stores() {
    let store = Arc::new(FakeTrustStore::default());
    let installer = TrustStoreInstaller::new(store.clone(), both_stores());

    let err = installer
        .install(&fixture("dev-signing.cer"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientPrivilege);
    assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    assert!(store.snapshot().is_empty());
}

fn bundle_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::copy(
        fixture("dev-signing.cer"),
        dir.path().join(CERTIFICATE_FILE_NAME),
    )
    .unwrap();
    dir
}

#[tokio::test]
async fn import_reports_installed_then_already_trusted() {
    let bundle = bundle_dir();
    let cwd = TempDir::new().unwrap();
    let store = Arc::new(FakeTrustStore::elevated());
    let workflow = ImportWorkflow::new(TrustStoreInstaller::new(store, both_stores()));

    let first = workflow.run(Some(bundle.path()), cwd.path()).await;
    assert!(matches!(first, ImportOutcome::Installed { .. }));
    assert_eq!(first.exit_code(), exit_code::SUCCESS);

    let second = workflow.run(Some(bundle.path()), cwd.path()).await;
    assert!(matches!(second, ImportOutcome::AlreadyTrusted { .. }));
    assert_eq!(second.exit_code(), exit_code::SUCCESS);

    let line: serde_json::Value = serde_json::from_str(&second.to_json_line()).unwrap();
    assert_eq!(line["status"], "already_trusted");
    assert_eq!(line["report"]["thumbprint"], DEV_CERT_THUMBPRINT);
}

#[tokio::test]
async fn import_falls_back_to_working_directory() {
    let exe_dir = TempDir::new().unwrap();
    let cwd = bundle_dir();
    let workflow = ImportWorkflow::new(TrustStoreInstaller::new(
        Arc::new(FakeTrustStore::elevated()),
        both_stores(),
    ));

    let outcome = workflow.run(Some(exe_dir.path()), cwd.path()).await;
    match outcome {
        ImportOutcome::Installed { certificate, .. } => {
            assert_eq!(certificate, cwd.path().join(CERTIFICATE_FILE_NAME));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn import_exit_codes_for_failures() {
    let empty = TempDir::new().unwrap();
    let workflow = ImportWorkflow::new(TrustStoreInstaller::new(
        Arc::new(FakeTrustStore::elevated()),
        both_stores(),
    ));
    let missing = workflow.run(None, empty.path()).await;
    assert!(matches!(
        missing,
        ImportOutcome::CertificateUnavailable {
            certificate: None,
            ..
        }
    ));
    assert_eq!(missing.exit_code(), exit_code::CERTIFICATE_UNAVAILABLE);

    let garbage = TempDir::new().unwrap();
    std::fs::write(garbage.path().join(CERTIFICATE_FILE_NAME), b"not a certificate").unwrap();
    let unreadable = workflow.run(None, garbage.path()).await;
    assert_eq!(unreadable.exit_code(), exit_code::CERTIFICATE_UNAVAILABLE);

    let bundle = bundle_dir();
    let unelevated = ImportWorkflow::new(TrustStoreInstaller::new(
        Arc::new(FakeTrustStore::default()),
        both_stores(),
    ));
    let denied = unelevated.run(None, bundle.path()).await;
    assert_eq!(denied.exit_code(), exit_code::INSUFFICIENT_PRIVILEGE);
    match denied {
        ImportOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::InsufficientPrivilege),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn import_with_unreachable_store_is_a_general_failure() {
    let bundle = bundle_dir();
    let workflow = ImportWorkflow::new(TrustStoreInstaller::new(
        Arc::new(PowerShellTrustStore::new(PowerShellHost::new(
            "definitely-not-a-powershell-host",
        ))),
        both_stores(),
    ));

    let outcome = workflow.run(None, bundle.path()).await;
    assert_eq!(outcome.exit_code(), exit_code::FAILURE);
    match outcome {
        ImportOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::IoError),
        other => panic!("unexpected outcome {other:?}"),
    }
}
