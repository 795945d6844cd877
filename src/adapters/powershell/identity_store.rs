//! Identity store reading `Cert:\CurrentUser\My`.

use super::host::PowerShellHost;
use crate::adapters::backend::IdentityStore;
use crate::domain::identity::CertificateEntry;
use crate::domain::types::Thumbprint;
use crate::infra::error::{SigningError, SigningResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const LIST_SCRIPT: &str = r#"
$codeSigning = '1.3.6.1.5.5.7.3.3'
$entries = @(Get-ChildItem -Path 'Cert:\CurrentUser\My' | ForEach-Object {
    [ordered]@{
        thumbprint      = $_.Thumbprint
        subject         = $_.Subject
        not_after       = $_.NotAfter.ToUniversalTime().ToString('o')
        code_signing    = (@($_.EnhancedKeyUsageList | ForEach-Object { $_.ObjectId }) -contains $codeSigning)
        has_private_key = $_.HasPrivateKey
    }
})
Write-Result $entries
"#;

#[derive(Deserialize)]
struct RawEntry {
    thumbprint: String,
    subject: String,
    not_after: DateTime<Utc>,
    code_signing: bool,
    has_private_key: bool,
}

impl TryFrom<RawEntry> for CertificateEntry {
    type Error = SigningError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Ok(CertificateEntry {
            thumbprint: Thumbprint::new(raw.thumbprint)?,
            subject: raw.subject,
            not_after: raw.not_after,
            code_signing: raw.code_signing,
            has_private_key: raw.has_private_key,
        })
    }
}

/// The current user's personal certificate store.
#[derive(Debug, Clone, Default)]
pub struct PowerShellIdentityStore {
    host: PowerShellHost,
}

impl PowerShellIdentityStore {
    #[must_use]
    pub fn new(host: PowerShellHost) -> Self {
        Self { host }
    }
}

#[async_trait]
impl IdentityStore for PowerShellIdentityStore {
    async fn list(&self) -> SigningResult<Vec<CertificateEntry>> {
        let raw = self
            .host
            .invoke::<Vec<RawEntry>>(LIST_SCRIPT, &[])
            .await?
            .map_err(|f| {
                SigningError::CertificateError(format!("Cannot read certificate store: {}", f.message))
            })?;

        raw.into_iter().map(CertificateEntry::try_from).collect()
    }
}
