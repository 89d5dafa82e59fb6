//! Per-entity metadata lookups

mod service;

pub use service::DetailFetcher;
