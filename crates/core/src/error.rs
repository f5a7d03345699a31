//! Error types for Exgate.

use thiserror::Error;

/// Result type alias using Exgate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Exgate.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Gateway Errors (HTTP surface, rejected before orchestration)
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    // =========================================================================
    // Upstream Errors (scoped to a single URL, recovered by the orchestrator)
    // =========================================================================
    #[error("Upstream request timed out")]
    UpstreamTimeout,

    #[error("Upstream rate limit persisted across the retry budget")]
    UpstreamThrottled,

    #[error("Upstream error ({status}): {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    // =========================================================================
    // Admission Gate (batch-wide)
    // =========================================================================
    #[error("Upstream extraction service is unavailable")]
    UpstreamUnavailable,

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is scoped to a single upstream call.
    ///
    /// Per-URL errors are absorbed into the batch outcome's failed list;
    /// everything else propagates.
    pub fn is_per_url(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout
                | Self::UpstreamThrottled
                | Self::UpstreamError { .. }
                | Self::UpstreamUnreachable(_)
        )
    }

    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::UpstreamThrottled => "UPSTREAM_THROTTLED",
            Self::UpstreamError { .. } => "UPSTREAM_ERROR",
            Self::UpstreamUnreachable(_) => "UPSTREAM_UNREACHABLE",
            Self::UpstreamUnavailable => "API_UNAVAILABLE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
