//! Error types used throughout the pipeline

use thiserror::Error;

/// Broad classification of a [`ReportFlowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic client-side failure (configuration, decoding, transport)
    Client,
    /// The REST API reported a business error
    Api,
    /// Credentials were rejected or could not be used
    Auth,
    /// The persisted token expired and could not be renewed
    TokenExpired,
    /// The reporting backend reported an error
    Report,
    /// Token store I/O failure
    Storage,
}

impl ErrorKind {
    /// Numeric code attached to every error of this kind.
    pub const fn code(self) -> i32 {
        match self {
            Self::Client => -1,
            Self::Api => 1000,
            Self::Auth => 2000,
            Self::TokenExpired => 2100,
            Self::Report => 3000,
            Self::Storage => 4000,
        }
    }
}

/// Main error type for ReportFlow
#[derive(Error, Debug)]
pub enum ReportFlowError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Invalid grant configuration: {0}")]
    InvalidGrantConfig(String),

    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        /// HTTP status returned by the auth endpoint, when one was received
        status: Option<u16>,
    },

    #[error("Token expired at {expired_at} and could not be renewed")]
    TokenExpired {
        expired_at: i64,
        #[source]
        cause: Option<Box<ReportFlowError>>,
    },

    #[error("Failed to decode response: {0}")]
    ClientDecode(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to read token store {path}: {message}")]
    StorageRead { path: String, message: String },

    #[error("Failed to write token store {path}: {message}")]
    StorageWrite { path: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportFlowError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredential(_)
            | Self::ClientDecode(_)
            | Self::Config(_)
            | Self::Network(_)
            | Self::Internal(_) => ErrorKind::Client,
            Self::Api(_) => ErrorKind::Api,
            Self::InvalidGrantConfig(_) | Self::AuthenticationFailed { .. } => ErrorKind::Auth,
            Self::TokenExpired { .. } => ErrorKind::TokenExpired,
            Self::Report(_) => ErrorKind::Report,
            Self::StorageRead { .. }
            | Self::StorageWrite { .. }
            | Self::NotFound(_)
            | Self::MalformedData(_) => ErrorKind::Storage,
        }
    }

    /// Numeric error code, stable across releases.
    pub fn code(&self) -> i32 {
        self.kind().code()
    }

    /// Shorthand for an [`ReportFlowError::AuthenticationFailed`] without a status.
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into(), status: None }
    }
}

/// Result type alias for ReportFlow operations
pub type Result<T> = std::result::Result<T, ReportFlowError>;
