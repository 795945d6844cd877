//! Local-machine trust stores via `System.Security.Cryptography.X509Certificates.X509Store`.

use super::host::PowerShellHost;
use crate::adapters::backend::TrustStore;
use crate::domain::certificate::CertificateFile;
use crate::domain::trust::TrustStoreName;
use crate::domain::types::Thumbprint;
use crate::infra::error::{SigningError, SigningResult};
use async_trait::async_trait;
use base64::Engine as _;
use std::ffi::OsString;

const ELEVATION_SCRIPT: &str = r#"
$principal = New-Object Security.Principal.WindowsPrincipal([Security.Principal.WindowsIdentity]::GetCurrent())
Write-Result $principal.IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)
"#;

const CONTAINS_SCRIPT: &str = r#"
$store = New-Object System.Security.Cryptography.X509Certificates.X509Store($env:SS_STORE, 'LocalMachine')
$store.Open('ReadOnly')
try {
    $found = $store.Certificates.Find('FindByThumbprint', $env:SS_THUMBPRINT, $false)
    Write-Result ($found.Count -gt 0)
} finally {
    $store.Close()
}
"#;

const ADD_SCRIPT: &str = r#"
$bytes = [Convert]::FromBase64String($env:SS_CERTIFICATE)
$cert = New-Object System.Security.Cryptography.X509Certificates.X509Certificate2(,$bytes)
$store = New-Object System.Security.Cryptography.X509Certificates.X509Store($env:SS_STORE, 'LocalMachine')
try {
    $store.Open('ReadWrite')
} catch [System.Security.Cryptography.CryptographicException] {
    Write-Failure 'access_denied' $_.Exception.Message
    $store = $null
}
if ($store) {
    try {
        $store.Add($cert)
        Write-Result $null
    } finally {
        $store.Close()
    }
}
"#;

/// `LocalMachine` certificate stores on the current host.
#[derive(Debug, Clone, Default)]
pub struct PowerShellTrustStore {
    host: PowerShellHost,
}

impl PowerShellTrustStore {
    #[must_use]
    pub fn new(host: PowerShellHost) -> Self {
        Self { host }
    }
}

#[async_trait]
impl TrustStore for PowerShellTrustStore {
    async fn is_elevated(&self) -> SigningResult<bool> {
        self.host
            .invoke::<bool>(ELEVATION_SCRIPT, &[])
            .await?
            .map_err(|f| {
                SigningError::InsufficientPrivilege(format!(
                    "Cannot determine privilege level: {}",
                    f.message
                ))
            })
    }

    async fn contains(
        &self,
        store: TrustStoreName,
        thumbprint: &Thumbprint,
    ) -> SigningResult<bool> {
        let env = [
            ("SS_STORE", OsString::from(store.store_name())),
            ("SS_THUMBPRINT", OsString::from(thumbprint.as_str())),
        ];
        self.host
            .invoke::<bool>(CONTAINS_SCRIPT, &env)
            .await?
            .map_err(|f| {
                SigningError::CertificateError(format!("Cannot open {store} store: {}", f.message))
            })
    }

    async fn add(&self, store: TrustStoreName, certificate: &CertificateFile) -> SigningResult<()> {
        log::info!("Adding {} to {store} store", certificate.thumbprint());
        let encoded = base64::engine::general_purpose::STANDARD.encode(certificate.as_der());
        let env = [
            ("SS_STORE", OsString::from(store.store_name())),
            ("SS_CERTIFICATE", OsString::from(encoded)),
        ];
        self.host
            .invoke::<()>(ADD_SCRIPT, &env)
            .await?
            .map_err(|f| match f.kind.as_str() {
                "access_denied" => SigningError::InsufficientPrivilege(f.message),
                _ => SigningError::CertificateError(format!(
                    "Cannot add certificate to {store} store: {}",
                    f.message
                )),
            })
    }
}
