use thiserror::Error;

/// Failures of the System-of-Record, local storage and queue paths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The endpoint answered but refused the request (`status: "error"`)
    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Failures of the Remote Cache Backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("cache quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("cache backend not available")]
    Unavailable,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload error: {0}")]
    Payload(String),
}

impl CacheError {
    /// Quota errors put the controller in fallback mode immediately
    pub fn is_quota(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded(_))
    }
}
