//! Service layer module root.
//! Contains the workflow core: artifact selection, permission rules,
//! identity enumeration, the workflow controller and trust installation.

pub mod identity;
pub mod permissions;
pub mod selector;
pub mod trust_installer;
pub mod workflow;

pub use identity::IdentityCatalog;
pub use permissions::{compute_permissions, ensure_permitted, required_kind};
pub use selector::ArtifactSelector;
pub use trust_installer::TrustStoreInstaller;
pub use workflow::{SignOutcome, WorkflowController, WorkflowServices, WorkflowSettings};
