//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides:
//! - Configuration management and validation
//! - Error handling and result types
//! - Bounded waits on delegated services

pub mod config;
pub mod error;
pub mod timeout;
