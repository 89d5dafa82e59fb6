//! Domain data types

pub mod credential;
pub mod report;
pub mod token;

pub use credential::{Credential, GrantType};
pub use report::{EntityDetails, ReportLinks};
pub use token::{IssuedToken, Token};
