//! Extension decision oracle port.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for oracle calls.
pub type OracleResult<T> = Result<T, OracleError>;

/// Input handed to the oracle for one extension request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPlea {
    /// Free-text reason supplied by the talent.
    pub justification: String,
    /// Whether another talent could take over the task.
    pub alternate_available: bool,
}

impl ExtensionPlea {
    /// Creates a plea.
    #[must_use]
    pub fn new(justification: impl Into<String>, alternate_available: bool) -> Self {
        Self {
            justification: justification.into(),
            alternate_available,
        }
    }
}

/// Oracle verdict on an extension request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionVerdict {
    /// Grant the extension.
    Approve,
    /// Refuse the extension.
    Reject,
}

/// Narrow capability deciding whether an extension is granted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExtensionOracle: Send + Sync {
    /// Returns the verdict for `plea`.
    async fn decide(&self, plea: &ExtensionPlea) -> OracleResult<ExtensionVerdict>;
}

/// Errors returned by oracle adapters.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The oracle did not answer within the configured bound.
    #[error("extension oracle timed out")]
    Timeout,

    /// The oracle answered with something that could not be interpreted.
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    /// The request could not be delivered or the service failed.
    #[error("extension oracle transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl OracleError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
