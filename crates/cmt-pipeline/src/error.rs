//! Error types for the recommendation pipeline
//!
//! Lookup failures are recovered inside the pipeline and surface as run
//! outcomes or warnings. Only a malformed trigger is rejected outright.

/// A remote lookup failed
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Service-level failure reported without an HTTP status
    #[error("service error: {0}")]
    Service(String),
}

impl LookupError {
    /// Whether retrying the same request could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Service(_) => false,
        }
    }
}

/// Pipeline input rejected before a run starts
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Requirement values out of range
    #[error("invalid sizing request: {0}")]
    InvalidRequest(String),
}
