//! Resilience primitives
//!
//! Only delay arithmetic lives here. Sleeping and deciding when to stop are left
//! to the caller.

mod backoff;

pub use backoff::ExponentialBackoff;
