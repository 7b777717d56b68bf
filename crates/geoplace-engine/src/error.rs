use geoplace_upstream::{UpstreamError, UpstreamErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure of an engine operation.
#[derive(Debug, Error)]
pub enum PlaceError {
    /// Caller input was rejected before any upstream call.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("places service is not configured: {0}")]
    NotConfigured(String),

    #[error("places service unavailable: {0}")]
    Unavailable(String),

    #[error("places service rejected the request: {0}")]
    Rejected(String),

    /// Nothing matched. A normal outcome, reported distinctly from failures.
    #[error("{0}")]
    NotFound(String),

    /// The caller cancelled the request; partial results were discarded.
    #[error("request cancelled")]
    Cancelled,
}

/// Wire name of a [`PlaceError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    UpstreamNotConfigured,
    UpstreamUnavailable,
    UpstreamRejected,
    NotFound,
    Cancelled,
}

/// Structured error returned across the caller-facing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl PlaceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaceError::Validation(_) => ErrorKind::ValidationError,
            PlaceError::NotConfigured(_) => ErrorKind::UpstreamNotConfigured,
            PlaceError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
            PlaceError::Rejected(_) => ErrorKind::UpstreamRejected,
            PlaceError::NotFound(_) => ErrorKind::NotFound,
            PlaceError::Cancelled => ErrorKind::Cancelled,
        }
    }

    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<UpstreamError> for PlaceError {
    fn from(err: UpstreamError) -> Self {
        if let UpstreamError::NotConfigured(reason) = err {
            return PlaceError::NotConfigured(reason);
        }
        let reason = err.reason();
        match err.kind() {
            UpstreamErrorKind::NotConfigured => PlaceError::NotConfigured(reason),
            UpstreamErrorKind::Unavailable => PlaceError::Unavailable(reason),
            UpstreamErrorKind::Rejected => PlaceError::Rejected(reason),
        }
    }
}

/// A raw upstream record that could not be read as a place at all.
///
/// Executors skip such records and keep going; this never aborts a batch.
#[derive(Debug, Error)]
#[error("malformed place record: {reason}")]
pub struct MalformedRecordError {
    pub reason: String,
}
