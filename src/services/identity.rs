//! Catalog of signing identities enumerated from the identity store.

use crate::adapters::backend::IdentityStore;
use crate::domain::identity::SigningIdentity;
use crate::domain::types::Thumbprint;
use crate::infra::error::SigningResult;
use crate::infra::timeout::{with_timeout, DEFAULT_SERVICE_TIMEOUT_SECONDS};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Last enumeration of code-signing identities.
///
/// The store is the single source of truth: every [`IdentityCatalog::refresh`]
/// replaces the list wholesale. Expired identities stay listed so callers can
/// flag them.
pub struct IdentityCatalog {
    store: Arc<dyn IdentityStore>,
    timeout: Duration,
    identities: Vec<SigningIdentity>,
}

impl IdentityCatalog {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECONDS),
            identities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Re-enumerate the store, keeping entries that can sign code.
    ///
    /// # Errors
    ///
    /// Returns the store's error, or `ServiceUnresponsive`. The previous
    /// list is kept on failure.
    pub async fn refresh(&mut self) -> SigningResult<&[SigningIdentity]> {
        let entries = with_timeout("identity store", self.timeout, self.store.list()).await?;
        let total = entries.len();
        let now = Utc::now();

        let identities: Vec<SigningIdentity> = entries
            .into_iter()
            .filter(|entry| entry.can_sign_code())
            .map(SigningIdentity::from)
            .collect();

        for identity in identities.iter().filter(|id| !id.is_valid_at(now)) {
            log::warn!("Signing identity {identity} expired on {}", identity.not_after());
        }
        log::info!(
            "Found {} code-signing identities ({total} certificates in store)",
            identities.len()
        );

        self.identities = identities;
        Ok(&self.identities)
    }

    #[must_use]
    pub fn list(&self) -> &[SigningIdentity] {
        &self.identities
    }

    #[must_use]
    pub fn find(&self, thumbprint: &Thumbprint) -> Option<&SigningIdentity> {
        self.identities
            .iter()
            .find(|identity| identity.thumbprint() == thumbprint)
    }
}

impl std::fmt::Debug for IdentityCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCatalog")
            .field("timeout", &self.timeout)
            .field("identities", &self.identities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::CertificateEntry;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    struct ListStore(Mutex<Vec<CertificateEntry>>);

    #[async_trait]
    impl IdentityStore for ListStore {
        async fn list(&self) -> SigningResult<Vec<CertificateEntry>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    fn entry(fill: char, days: i64, code_signing: bool) -> CertificateEntry {
        CertificateEntry {
            thumbprint: Thumbprint::new(fill.to_string().repeat(40)).unwrap(),
            subject: format!("CN={fill}"),
            not_after: Utc::now() + ChronoDuration::days(days),
            code_signing,
            has_private_key: true,
        }
    }

    #[tokio::test]
    async fn test_refresh_filters_capability_and_keeps_expired() {
        let store = Arc::new(ListStore(Mutex::new(vec![
            entry('A', 30, true),
            entry('B', -1, true),
            entry('C', 30, false),
        ])));
        let mut catalog = IdentityCatalog::new(store);

        let identities = catalog.refresh().await.unwrap();
        assert_eq!(identities.len(), 2);
        assert!(identities.iter().any(|id| !id.is_valid()));

        let expired = Thumbprint::new("B".repeat(40)).unwrap();
        assert!(catalog.find(&expired).is_some());
        let unusable = Thumbprint::new("C".repeat(40)).unwrap();
        assert!(catalog.find(&unusable).is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let store = Arc::new(ListStore(Mutex::new(vec![entry('A', 30, true)])));
        let mut catalog = IdentityCatalog::new(store.clone());
        catalog.refresh().await.unwrap();

        *store.0.lock().unwrap() = vec![entry('D', 30, true)];
        catalog.refresh().await.unwrap();

        assert_eq!(catalog.list().len(), 1);
        assert_eq!(catalog.list()[0].subject(), "CN=D");
    }
}
