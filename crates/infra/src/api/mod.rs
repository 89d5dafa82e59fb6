//! Report API adapter
//!
//! Structured (GraphQL) and field (REST) queries plus report downloads,
//! authenticated with a bearer token that is renewed on demand.

mod client;

pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig};
