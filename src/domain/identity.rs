//! Code-signing identities and raw certificate-store entries.

use crate::domain::types::Thumbprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A certificate as reported by the identity store, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEntry {
    pub thumbprint: Thumbprint,
    pub subject: String,
    pub not_after: DateTime<Utc>,
    /// Carries the Code Signing extended key usage.
    pub code_signing: bool,
    /// A private key is associated with the certificate.
    pub has_private_key: bool,
}

impl CertificateEntry {
    /// Whether this entry may be offered as a signing identity.
    #[must_use]
    pub fn can_sign_code(&self) -> bool {
        self.code_signing && self.has_private_key
    }
}

/// A selectable code-signing credential.
///
/// Never mutated; a refresh of the identity store replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    thumbprint: Thumbprint,
    subject: String,
    not_after: DateTime<Utc>,
}

impl SigningIdentity {
    #[must_use]
    pub fn new(thumbprint: Thumbprint, subject: impl Into<String>, not_after: DateTime<Utc>) -> Self {
        Self {
            thumbprint,
            subject: subject.into(),
            not_after,
        }
    }

    #[must_use]
    pub fn thumbprint(&self) -> &Thumbprint {
        &self.thumbprint
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after > now
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whole days until expiry; negative once expired.
    #[must_use]
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now).num_days()
    }
}

impl From<CertificateEntry> for SigningIdentity {
    fn from(entry: CertificateEntry) -> Self {
        Self::new(entry.thumbprint, entry.subject, entry.not_after)
    }
}

impl fmt::Display for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.subject, self.thumbprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thumbprint() -> Thumbprint {
        Thumbprint::new("A909502DD82AE41433E6F83886B00D4277A32A7B").unwrap()
    }

    #[test]
    fn test_validity_is_strictly_before_expiry() {
        let now = Utc::now();
        let identity = SigningIdentity::new(thumbprint(), "CN=Dev Cert", now);
        assert!(!identity.is_valid_at(now));
        assert!(identity.is_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_days_until_expiry_goes_negative() {
        let now = Utc::now();
        let identity = SigningIdentity::new(thumbprint(), "CN=Old", now - Duration::days(10));
        assert_eq!(identity.days_until_expiry(now), -10);
        assert!(!identity.is_valid());
    }

    #[test]
    fn test_entry_requires_usage_and_key() {
        let mut entry = CertificateEntry {
            thumbprint: thumbprint(),
            subject: "CN=Dev Cert".to_string(),
            not_after: Utc::now(),
            code_signing: true,
            has_private_key: true,
        };
        assert!(entry.can_sign_code());
        entry.has_private_key = false;
        assert!(!entry.can_sign_code());
        entry.has_private_key = true;
        entry.code_signing = false;
        assert!(!entry.can_sign_code());
    }
}
