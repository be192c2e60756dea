//! Error types for the Anypoint provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors raised while talking to the Anypoint management APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A success response whose body could not be decoded.
    #[error("unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured server index does not name a known host.
    #[error("server index {index} out of range ({available} servers configured)")]
    InvalidServerIndex {
        /// Requested index.
        index: usize,
        /// Number of configured servers.
        available: usize,
    },
}

impl ApiError {
    /// Text reported as the detail of a failed operation.
    ///
    /// This is the response body when the API answered, otherwise the
    /// error's own message.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the API reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that can occur while serving provider requests.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A failed resource or data source operation, reported verbatim to the host.
    #[error("{summary}: {detail}")]
    Operation {
        /// Short description of what failed.
        summary: String,
        /// Response body or local error text.
        detail: String,
    },

    /// Validation produced one or more error diagnostics.
    #[error("{} validation error(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Binding or signal handling failed while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote write succeeded but a later step failed. `state` is what
    /// the host must record so the remote object stays tracked.
    #[error("{error}")]
    PartiallyApplied {
        /// State reflecting the completed remote write.
        state: serde_json::Value,
        /// The failure that followed it.
        error: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Build an [`ProviderError::Operation`] from an API failure.
    pub fn api(summary: impl Into<String>, err: &ApiError) -> Self {
        Self::Operation {
            summary: summary.into(),
            detail: err.detail(),
        }
    }

    /// Build an [`ProviderError::Operation`] from a local failure.
    pub fn operation(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Operation {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Attach the state left behind by a completed remote write.
    pub fn partially_applied(state: serde_json::Value, error: ProviderError) -> Self {
        Self::PartiallyApplied {
            state,
            error: Box::new(error),
        }
    }

    /// Split off the partially applied state, if any.
    pub fn into_parts(self) -> (Option<serde_json::Value>, ProviderError) {
        match self {
            Self::PartiallyApplied { state, error } => (Some(state), *error),
            other => (None, other),
        }
    }

    /// Convert into the diagnostics returned to the host.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::PartiallyApplied { error, .. } => error.into_diagnostics(),
            Self::Operation { summary, detail } => {
                vec![Diagnostic::error(summary).with_detail(detail)]
            },
            Self::Diagnostics(diagnostics) => diagnostics,
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Operation { .. } => tonic::Status::unknown(err.to_string()),
            ProviderError::Diagnostics(_) => tonic::Status::invalid_argument(err.to_string()),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Io(err) => tonic::Status::internal(format!("I/O error: {}", err)),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::PartiallyApplied { error, .. } => (*error).into(),
        }
    }
}
