//! Production adapters driving Windows PowerShell.
//!
//! Each adapter wraps one cmdlet family:
//! - signing: `Set-AuthenticodeSignature`, `Get-AuthenticodeSignature`
//! - packaging: `Invoke-PS2EXE`
//! - identities: the `Cert:\CurrentUser\My` provider
//! - trust: `X509Store` for `LocalMachine` stores
//! - processes: `Get-Process`

pub mod host;
pub mod identity_store;
pub mod packaging;
pub mod process;
pub mod signing;
pub mod trust_store;

pub use host::{HostFailure, PowerShellHost};
pub use identity_store::PowerShellIdentityStore;
pub use packaging::Ps2ExePackagingService;
pub use process::PowerShellProcessSupervisor;
pub use signing::PowerShellSigningService;
pub use trust_store::PowerShellTrustStore;

use crate::services::workflow::WorkflowServices;
use std::sync::Arc;

/// Workflow collaborators backed by one PowerShell host.
#[must_use]
pub fn workflow_services(host: &PowerShellHost) -> WorkflowServices {
    WorkflowServices {
        signing: Arc::new(PowerShellSigningService::new(host.clone())),
        packaging: Arc::new(Ps2ExePackagingService::new(host.clone())),
        identities: Arc::new(PowerShellIdentityStore::new(host.clone())),
        processes: Arc::new(PowerShellProcessSupervisor::new(host.clone())),
    }
}
