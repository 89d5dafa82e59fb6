//! Helpers for walking arbitrary `serde_json` trees

mod search;

pub use search::{search_key, KeySearch};
