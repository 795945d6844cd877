//! Script Signer Library
//!
//! Workflow core for Authenticode-signing PowerShell scripts, packaging them
//! as executables and distributing the publisher certificate. Signing,
//! packaging and certificate stores are delegated to Windows PowerShell
//! through the traits in [`adapters::backend`].
//!
//! Layers:
//! - [`domain`]: artifacts, identities, permissions, signature reports
//! - [`adapters`]: collaborator traits and their PowerShell implementations
//! - [`services`]: artifact selection, permission rules, the workflow
//!   controller and the trust-store installer
//! - [`pipelines`]: the certificate-import entry point
//! - [`infra`]: errors, configuration and bounded waits

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use domain::artifact::{ArtifactKind, ArtifactReference};
pub use domain::identity::SigningIdentity;
pub use domain::permissions::{Operation, WorkflowPermissions};
pub use domain::types::{HashAlgorithm, Thumbprint, TimestampUrl};
pub use infra::config::{ConfigManager, WorkbenchConfiguration};
pub use infra::error::{ErrorKind, SigningError, SigningResult};
pub use services::{WorkflowController, WorkflowServices, WorkflowSettings};
