//! Adapters for the token lifecycle ports

mod file_store;
mod token_endpoint;

pub use file_store::FileTokenStore;
pub use token_endpoint::HttpTokenIssuer;
