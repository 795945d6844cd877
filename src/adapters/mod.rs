//! Adapter layer modules for external system integration.
//!
//! Provides:
//! - Collaborator traits for signing, packaging, identity and trust stores
//!   and process supervision
//! - PowerShell-backed implementations of each

pub mod backend;
pub mod powershell;

pub use backend::{
    IdentityStore, PackagingService, ProcessSupervisor, SignRequest, SigningService, TrustStore,
};
