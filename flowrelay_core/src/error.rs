use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by the flow client, the session layer and the
/// orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input was malformed. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The flow engine answered with a non-success status.
    #[error("Flow engine API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// No response within the per-attempt deadline.
    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Transport-level failure such as a refused connection.
    #[error("Network error occurred: {0:#}")]
    Network(anyhow::Error),

    /// The flow engine replied successfully but in none of the known shapes.
    #[error("Unexpected response format from flow engine: {0}")]
    MalformedResponse(String),

    #[error("Missing required configuration: {0}")]
    Configuration(String),

    /// Every allowed attempt failed; `last` is the classified final failure.
    #[error("Failed to communicate with flow engine after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },
}

impl Error {
    /// Wrap an unexpected failure as an internal processing error, keeping the
    /// underlying error attached for diagnostics.
    #[must_use]
    pub fn internal(source: Self) -> Self {
        Self::Internal {
            message: "Failed to process message".to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether another attempt against the flow engine may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Classified failures are handed to the caller unchanged; everything
    /// else gets wrapped by the orchestrator.
    #[must_use]
    pub const fn is_caller_facing(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::Internal { .. })
    }

    /// The classified failure underneath any retry wrapping.
    #[must_use]
    pub fn last_failure(&self) -> &Self {
        match self {
            Self::Exhausted { last, .. } => last.last_failure(),
            other => other,
        }
    }

    /// HTTP status a caller-facing layer should report for this failure.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Upstream { status, .. } if (400..=599).contains(status) => *status,
            Self::Upstream { .. } => 502,
            Self::Timeout(_) => 408,
            Self::Exhausted { last, .. } => last.status_code(),
            Self::Network(_)
            | Self::MalformedResponse(_)
            | Self::Configuration(_)
            | Self::Internal { .. } => 500,
        }
    }
}
