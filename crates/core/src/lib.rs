//! # ReportFlow Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the token endpoint, token store and
//!   reporting API
//! - The token lifecycle policy ([`Authentication`])
//! - The report polling protocol ([`ReportService`])
//! - Bounded fan-out detail lookups ([`DetailFetcher`])
//!
//! ## Architecture Principles
//! - Only depends on `reportflow-common` and `reportflow-domain`
//! - No HTTP, filesystem or environment access
//! - All external dependencies via traits

pub mod auth;
pub mod enrich;
pub mod report;

pub use auth::ports::{TokenIssuer, TokenProvider, TokenRequest, TokenStore};
pub use auth::Authentication;
pub use enrich::DetailFetcher;
pub use report::ports::ReportApi;
pub use report::query::{build_status_query, StatusQuery};
pub use report::{PollingOptions, ReportService};
