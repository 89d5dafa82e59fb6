//! Common utilities shared across ReportFlow crates.
//!
//! # Feature Tiers
//!
//! - `foundation` (default): JSON tree search and backoff arithmetic
//!
//! Nothing in this crate performs I/O or logs.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "foundation")]
pub mod json;
pub mod resilience;

#[cfg(feature = "foundation")]
pub use json::{search_key, KeySearch};
pub use resilience::ExponentialBackoff;
