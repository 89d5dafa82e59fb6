//! Conversions from external infrastructure errors into domain errors.

use std::fmt::Display;
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::Path;

use reportflow_domain::ReportFlowError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ReportFlowError);

impl From<InfraError> for ReportFlowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ReportFlowError> for InfraError {
    fn from(value: ReportFlowError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoReportFlowError {
    fn into_reportflow(self) -> ReportFlowError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ReportFlowError */
/* -------------------------------------------------------------------------- */

// Statuses never arrive here: adapters inspect the response themselves.
impl IntoReportFlowError for HttpError {
    fn into_reportflow(self) -> ReportFlowError {
        if self.is_timeout() {
            return ReportFlowError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return ReportFlowError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_decode() || self.is_body() {
            return ReportFlowError::ClientDecode(format!("unable to read response body: {self}"));
        }

        if self.is_builder() {
            return ReportFlowError::Config(format!("invalid HTTP request: {self}"));
        }

        ReportFlowError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_reportflow())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ReportFlowError */
/* -------------------------------------------------------------------------- */

impl IntoReportFlowError for JsonError {
    fn into_reportflow(self) -> ReportFlowError {
        ReportFlowError::ClientDecode(format!(
            "invalid JSON at line {} column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_reportflow())
    }
}

/* -------------------------------------------------------------------------- */
/* Token file failures → ReportFlowError */
/* -------------------------------------------------------------------------- */

impl InfraError {
    /// Reading the token file failed. A missing file is `NotFound`.
    pub(crate) fn token_read(path: &Path, err: IoError) -> Self {
        let path = path.display().to_string();
        InfraError(match err.kind() {
            IoErrorKind::NotFound => {
                ReportFlowError::NotFound(format!("no token persisted at {path}"))
            }
            _ => ReportFlowError::StorageRead { path, message: err.to_string() },
        })
    }

    /// The token file was read but does not hold a token.
    pub(crate) fn token_decode(path: &Path, err: JsonError) -> Self {
        InfraError(ReportFlowError::MalformedData(format!(
            "token store {} is not a valid token: {err}",
            path.display()
        )))
    }

    /// Serializing or writing the token file failed.
    pub(crate) fn token_write(path: &Path, err: impl Display) -> Self {
        InfraError(ReportFlowError::StorageWrite {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
