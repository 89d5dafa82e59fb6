//! Pipeline constants
//!
//! Centralized location for protocol keys and defaults shared by every layer.

// Token persistence
pub const DEFAULT_TOKEN_PATH: &str = "dm_token.json";

// Report protocol keys
pub const REPORT_TOKEN_KEY: &str = "reportToken";
pub const STATUS_KEY: &str = "status";
pub const LINK_KEY: &str = "link";
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";

// Polling and fan-out defaults
pub const DEFAULT_BASE_DELAY_SECS: u64 = 1;
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 10;

// HTTP defaults
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;
