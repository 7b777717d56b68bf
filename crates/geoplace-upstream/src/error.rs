use std::time::Duration;

use thiserror::Error;

/// Errors returned by a places upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No credentials or endpoint are available; nothing was sent.
    #[error("upstream not configured: {0}")]
    NotConfigured(String),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("upstream returned HTTP {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    /// The call did not complete within the caller-supplied deadline.
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification used by the engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    NotConfigured,
    Unavailable,
    Rejected,
}

impl UpstreamError {
    #[must_use]
    pub fn kind(&self) -> UpstreamErrorKind {
        match self {
            UpstreamError::NotConfigured(_) => UpstreamErrorKind::NotConfigured,
            UpstreamError::Http(_)
            | UpstreamError::Timeout(_)
            | UpstreamError::Deserialize { .. } => UpstreamErrorKind::Unavailable,
            UpstreamError::Status { status, .. } => {
                if *status == 429 || *status >= 500 {
                    UpstreamErrorKind::Unavailable
                } else {
                    UpstreamErrorKind::Rejected
                }
            }
        }
    }

    /// `true` when the service reported that the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status { status: 404, .. })
    }

    /// Human-readable reason suitable for a caller-facing error payload.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            UpstreamError::Status { code, message, .. }
                if code == "AccessDeniedException" || code == "ResourceNotFoundException" =>
            {
                format!(
                    "{code}: {message}. Check that the API key is valid for this region \
                     and grants the geo-places actions."
                )
            }
            UpstreamError::Status { code, message, .. } => format!("{code}: {message}"),
            other => other.to_string(),
        }
    }
}
