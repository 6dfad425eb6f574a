//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session key is empty or otherwise unusable.
    #[error("Invalid session key: {0:?}")]
    InvalidKey(String),

    /// Session is absent or has expired.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Store configuration was rejected at construction time.
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Error from the persistence backend.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Whether this error means the session simply is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
