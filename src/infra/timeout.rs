//! Bounded waits on delegated services.

use crate::infra::error::{SigningError, SigningResult};
use std::future::Future;
use std::time::Duration;

/// Default bound on a single delegated call.
pub const DEFAULT_SERVICE_TIMEOUT_SECONDS: u64 = 120;

/// Await `future`, failing with `ServiceUnresponsive` once `limit` elapses.
///
/// The future is dropped on expiry, which kills any child process spawned
/// with `kill_on_drop`.
pub async fn with_timeout<T, F>(service: &'static str, limit: Duration, future: F) -> SigningResult<T>
where
    F: Future<Output = SigningResult<T>>,
{
    log::debug!("Waiting up to {}s for {service}", limit.as_secs());
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("{service} did not respond within {}s", limit.as_secs());
            Err(SigningError::ServiceUnresponsive {
                service,
                timeout: limit,
            })
        }
    }
}
