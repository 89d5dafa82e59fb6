//! # ReportFlow Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP client with retry support
//! - Token endpoint and file-backed token store adapters
//! - The authenticated platform API client
//! - Configuration loading from the environment or files
//!
//! ## Architecture
//! - Implements traits defined in `reportflow-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientConfig};
pub use auth::{FileTokenStore, HttpTokenIssuer};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
