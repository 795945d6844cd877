//! Signing service backed by `Set-AuthenticodeSignature` / `Get-AuthenticodeSignature`.

use super::host::{HostFailure, PowerShellHost};
use crate::adapters::backend::{SignRequest, SigningService};
use crate::domain::types::Thumbprint;
use crate::domain::verification::{SignatureReport, SignatureStatus};
use crate::infra::error::{SigningError, SigningResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;

const SIGN_SCRIPT: &str = r#"
$cert = Get-Item -LiteralPath ('Cert:\CurrentUser\My\' + $env:SS_THUMBPRINT) -ErrorAction SilentlyContinue
if (-not $cert) {
    Write-Failure 'identity_not_found' "No certificate with thumbprint $env:SS_THUMBPRINT in Cert:\CurrentUser\My"
} elseif ($cert.NotAfter -le (Get-Date)) {
    Write-Failure 'identity_expired' "Certificate $($cert.Subject) expired on $($cert.NotAfter.ToString('u'))"
} else {
    $params = @{
        LiteralPath   = $env:SS_PATH
        Certificate   = $cert
        HashAlgorithm = $env:SS_HASH
    }
    if ($env:SS_TIMESTAMP) { $params.TimestampServer = $env:SS_TIMESTAMP }
    $sig = Set-AuthenticodeSignature @params
    $status = $sig.Status.ToString()
    if ($null -eq $sig.SignerCertificate -or @('NotSigned', 'HashMismatch', 'NotSupportedFileFormat', 'Incompatible') -contains $status) {
        Write-Failure 'sign_failed' "$status. $($sig.StatusMessage)"
    } else {
        Write-Result $null
    }
}
"#;

const VERIFY_SCRIPT: &str = r#"
$sig = Get-AuthenticodeSignature -LiteralPath $env:SS_PATH
$status = $sig.Status.ToString()
if ($status -eq 'UnknownError' -and $sig.SignerCertificate) {
    $chain = New-Object System.Security.Cryptography.X509Certificates.X509Chain
    $null = $chain.Build($sig.SignerCertificate)
    if ($chain.ChainStatus | Where-Object { $_.Status.ToString() -eq 'UntrustedRoot' }) {
        $status = 'NotTrusted'
    }
}
Write-Result ([ordered]@{
    status         = $status
    status_message = [string]$sig.StatusMessage
    signer         = if ($sig.SignerCertificate) { $sig.SignerCertificate.Thumbprint } else { $null }
    timestamped    = ($null -ne $sig.TimeStamperCertificate)
})
"#;

#[derive(Deserialize)]
struct RawSignature {
    status: String,
    status_message: String,
    signer: Option<String>,
    timestamped: bool,
}

/// Authenticode signing through the PowerShell security module.
#[derive(Debug, Clone, Default)]
pub struct PowerShellSigningService {
    host: PowerShellHost,
}

impl PowerShellSigningService {
    #[must_use]
    pub fn new(host: PowerShellHost) -> Self {
        Self { host }
    }
}

fn map_sign_failure(failure: HostFailure) -> SigningError {
    match failure.kind.as_str() {
        "identity_not_found" => SigningError::IdentityNotFound(failure.message),
        "identity_expired" => SigningError::IdentityExpired(failure.message),
        _ => SigningError::SigningServiceFailure(failure.message),
    }
}

fn into_report(path: &Path, raw: RawSignature) -> SigningResult<SignatureReport> {
    let signer = raw.signer.as_deref().map(Thumbprint::new).transpose()?;
    Ok(SignatureReport {
        path: path.to_path_buf(),
        status: SignatureStatus::from_host(&raw.status),
        status_message: raw.status_message,
        signer,
        timestamped: raw.timestamped,
    })
}

#[async_trait]
impl SigningService for PowerShellSigningService {
    async fn sign(&self, request: &SignRequest) -> SigningResult<()> {
        log::info!(
            "Signing {} with {} ({}{})",
            request.path.display(),
            request.identity.thumbprint(),
            request.hash_algorithm,
            if request.timestamp_url.is_some() {
                ", timestamped"
            } else {
                ""
            }
        );

        let mut env = vec![
            ("SS_PATH", OsString::from(request.path.as_os_str())),
            (
                "SS_THUMBPRINT",
                OsString::from(request.identity.thumbprint().as_str()),
            ),
            ("SS_HASH", OsString::from(request.hash_algorithm.as_str())),
        ];
        if let Some(url) = &request.timestamp_url {
            env.push(("SS_TIMESTAMP", OsString::from(url.as_str())));
        }

        self.host
            .invoke::<()>(SIGN_SCRIPT, &env)
            .await
            .map_err(|e| SigningError::SigningServiceFailure(e.to_string()))?
            .map_err(map_sign_failure)
    }

    async fn verify(&self, path: &Path) -> SigningResult<SignatureReport> {
        let env = [("SS_PATH", OsString::from(path.as_os_str()))];
        let raw = self
            .host
            .invoke::<RawSignature>(VERIFY_SCRIPT, &env)
            .await
            .map_err(|e| SigningError::SigningServiceFailure(e.to_string()))?
            .map_err(|f| SigningError::SigningServiceFailure(f.message))?;
        into_report(path, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::error::ErrorKind;

    #[test]
    fn sign_failures_map_to_taxonomy() {
        let failure = |kind: &str| HostFailure {
            kind: kind.to_string(),
            message: "details".to_string(),
        };
        assert_eq!(
            map_sign_failure(failure("identity_expired")).kind(),
            ErrorKind::IdentityExpired
        );
        assert_eq!(
            map_sign_failure(failure("identity_not_found")).kind(),
            ErrorKind::IdentityNotFound
        );
        assert_eq!(
            map_sign_failure(failure("host")).kind(),
            ErrorKind::SigningServiceFailure
        );
    }

    #[test]
    fn report_parses_host_fields() {
        let raw: RawSignature = serde_json::from_str(
            r#"{"status":"NotTrusted","status_message":"root not trusted","signer":"e0c934926e8aa87d18cdd1592f849ca40ed640c1","timestamped":true}"#,
        )
        .unwrap();
        let report = into_report(Path::new("C:/work/report.ps1"), raw).unwrap();
        assert_eq!(report.status, SignatureStatus::NotTrusted);
        assert_eq!(
            report.signer.unwrap().as_str(),
            "E0C934926E8AA87D18CDD1592F849CA40ED640C1"
        );
        assert!(report.timestamped);
    }

    #[test]
    fn report_without_signer() {
        let raw: RawSignature = serde_json::from_str(
            r#"{"status":"NotSigned","status_message":"","signer":null,"timestamped":false}"#,
        )
        .unwrap();
        let report = into_report(Path::new("a.exe"), raw).unwrap();
        assert_eq!(report.status, SignatureStatus::NotSigned);
        assert!(report.signer.is_none());
    }
}
