//! Workflow pipelines orchestrating stateless services.

pub mod import;

pub use import::{ImportOutcome, ImportWorkflow, CERTIFICATE_FILE_NAME};
