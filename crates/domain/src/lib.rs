//! # ReportFlow Domain
//!
//! Business domain types for the report extraction pipeline.
//!
//! This crate contains:
//! - Error taxonomy and Result definition
//! - Credential and token models
//! - Configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other ReportFlow crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
