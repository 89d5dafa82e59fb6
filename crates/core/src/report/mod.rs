//! Asynchronous report generation: trigger, poll, collect links

pub mod ports;
pub mod query;
mod service;

pub use service::{PollingOptions, ReportService};
