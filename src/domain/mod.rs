//! Domain types for the signing workflow. No I/O beyond existence probes and certificate reads.

pub mod artifact;
pub mod certificate;
pub mod identity;
pub mod packaging;
pub mod permissions;
pub mod session;
pub mod trust;
pub mod types;
pub mod verification;
