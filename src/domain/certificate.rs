//! Public certificate files as distributed in the trust bundle.

use crate::domain::types::Thumbprint;
use crate::infra::error::{SigningError, SigningResult};
use chrono::{DateTime, Utc};
use der::Decode;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::fmt;
use std::path::Path;
use x509_cert::Certificate;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// A parsed `.cer` file (DER or PEM).
#[derive(Clone)]
pub struct CertificateFile {
    der: Box<[u8]>,
    thumbprint: Thumbprint,
    subject: String,
    issuer: String,
    not_after: DateTime<Utc>,
}

impl CertificateFile {
    pub fn read(path: &Path) -> SigningResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            SigningError::CertificateError(format!(
                "Failed to read certificate {}: {e}",
                path.display()
            ))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse DER bytes, or PEM text containing a single certificate.
    pub fn from_bytes(bytes: &[u8]) -> SigningResult<Self> {
        let trimmed = trim_leading_whitespace(bytes);
        let der = if trimmed.starts_with(PEM_PREFIX) {
            let (label, der) = der::pem::decode_vec(trimmed).map_err(|e| {
                SigningError::CertificateError(format!("Invalid PEM certificate: {e}"))
            })?;
            if label != "CERTIFICATE" {
                return Err(SigningError::CertificateError(format!(
                    "Expected a CERTIFICATE PEM block, found {label}"
                )));
            }
            der
        } else {
            bytes.to_vec()
        };
        Self::from_der(der)
    }

    pub fn from_der(der: Vec<u8>) -> SigningResult<Self> {
        let certificate = Certificate::from_der(&der)?;
        let tbs = &certificate.tbs_certificate;

        let not_after_secs = tbs.validity.not_after.to_unix_duration().as_secs();
        let not_after = i64::try_from(not_after_secs)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| {
                SigningError::CertificateError("Certificate expiry is out of range".to_string())
            })?;

        let thumbprint = Thumbprint::from_digest(&Sha1::digest(&der))?;

        Ok(Self {
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            not_after,
            thumbprint,
            der: der.into_boxed_slice(),
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// SHA-1 fingerprint, the key Windows certificate stores are indexed by.
    #[must_use]
    pub fn thumbprint(&self) -> &Thumbprint {
        &self.thumbprint
    }

    /// SHA-256 fingerprint for display.
    #[must_use]
    pub fn sha256_fingerprint(&self) -> String {
        hex::encode_upper(Sha256::digest(&self.der))
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

impl fmt::Debug for CertificateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CertificateFile(subject={}, thumbprint={}, len={})",
            self.subject,
            self.thumbprint,
            self.der.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DER_FIXTURE: &[u8] = include_bytes!("../../tests/fixtures/dev-signing.cer");
    const PEM_FIXTURE: &[u8] = include_bytes!("../../tests/fixtures/dev-signing.pem");
    const FIXTURE_THUMBPRINT: &str = "E0C934926E8AA87D18CDD1592F849CA40ED640C1";

    #[test]
    fn test_der_thumbprint_matches_windows_fingerprint() {
        let cert = CertificateFile::from_bytes(DER_FIXTURE).unwrap();
        assert_eq!(cert.thumbprint().as_str(), FIXTURE_THUMBPRINT);
        assert_eq!(
            cert.sha256_fingerprint(),
            "D4EBACC561BD34E2C11E780D563A2DE083C20AF09721BB3C81BE4071C7F55564"
        );
        assert!(cert.subject().contains("CN=Dev Cert"));
        assert!(cert.is_self_signed());
        assert!(cert.not_after() > Utc::now());
    }

    #[test]
    fn test_pem_and_der_agree() {
        let from_pem = CertificateFile::from_bytes(PEM_FIXTURE).unwrap();
        let from_der = CertificateFile::from_bytes(DER_FIXTURE).unwrap();
        assert_eq!(from_pem.thumbprint(), from_der.thumbprint());
        assert_eq!(from_pem.as_der(), from_der.as_der());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = CertificateFile::from_bytes(b"definitely not a certificate").unwrap_err();
        assert!(matches!(err, SigningError::CertificateError(_)));
    }

    #[test]
    fn test_rejects_wrong_pem_label() {
        let pem = b"-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(CertificateFile::from_bytes(pem).is_err());
    }

    #[test]
    fn test_trim_leading_whitespace() {
        assert_eq!(trim_leading_whitespace(b"  \r\nabc"), b"abc");
        assert_eq!(trim_leading_whitespace(b"   "), b"");
    }
}
