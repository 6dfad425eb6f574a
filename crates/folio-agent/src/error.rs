//! Error types for the continuation protocol.

use folio_types::ItemError;
use thiserror::Error;

use crate::tool::ParameterValidationError;

/// Result type alias using the continuation error type.
pub type Result<T> = std::result::Result<T, ContinuationError>;

/// What an agent or end user is told when a session is gone.
pub const EXPIRED_MESSAGE: &str = "your previous request expired; please ask again";

/// Error signals of the continuation protocol.
///
/// Every variant is returned, never raised; a caller branches on it to
/// decide whether to restart the session or report failure upward.
#[derive(Debug, Error)]
pub enum ContinuationError {
    /// Session key is empty or malformed. Caller bug, not retryable as-is.
    #[error("Invalid session key: {0:?}")]
    InvalidKey(String),

    /// Session is absent or expired. Retry by re-running the upstream
    /// computation and starting again.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// Requested page size was not positive.
    #[error("Invalid page size {0}: must be at least 1")]
    InvalidPageSize(usize),

    /// An item failed validation at the `start` boundary.
    #[error("Invalid item at index {index}: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: ItemError,
    },

    /// The driver hit its iteration bound without reaching exhaustion.
    /// Signals a store defect; log and surface, do not retry.
    #[error("Continuation stalled for session {session_key} after {iterations} iterations")]
    ContinuationStalled {
        session_key: String,
        iterations: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(folio_session::Error),
}

impl ContinuationError {
    /// Whether restarting the session can resolve this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UnknownSession(_))
    }

    /// Message suitable for an end user or agent.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownSession(_) => EXPIRED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<folio_session::Error> for ContinuationError {
    fn from(err: folio_session::Error) -> Self {
        match err {
            folio_session::Error::InvalidKey(key) => Self::InvalidKey(key),
            folio_session::Error::NotFound(key) => Self::UnknownSession(key),
            folio_session::Error::InvalidConfig(msg) => Self::Config(msg),
            other => Self::Store(other),
        }
    }
}

/// Error type for tool dispatch.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Invalid tool parameters.
    #[error("Invalid tool parameters: {0}")]
    InvalidParams(#[from] ParameterValidationError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
