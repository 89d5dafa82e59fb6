//! Token lifecycle: issuing, refreshing and caching access tokens

pub mod ports;
mod service;

pub use service::Authentication;
