//! Error mapping at the infrastructure boundary

mod conversions;

pub use conversions::InfraError;
