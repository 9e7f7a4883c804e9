//! Lease operation errors

use crate::manager::LeaseId;

/// Boxed backend error carried by [`PoolError::Connect`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for acquire and release
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No connection freed up before the wait policy elapsed
    #[error("Timed out waiting for a pooled connection")]
    Timeout,

    /// The pool has been shut down
    #[error("Connection pool has been shut down")]
    Exhausted,

    /// The lease is not checked out from this pool
    #[error("Lease {0} is not checked out from this pool")]
    DoubleRelease(LeaseId),

    /// Opening a new backend connection failed
    #[error("Failed to open connection: {0}")]
    Connect(#[source] BoxError),
}

impl PoolError {
    /// Check whether retrying `acquire` may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_))
    }

    /// Get error code for log fields and probe output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::Exhausted => "EXHAUSTED",
            Self::DoubleRelease(_) => "DOUBLE_RELEASE",
            Self::Connect(_) => "CONNECT_FAILED",
        }
    }
}

/// Result type for lease operations
pub type PoolResult<T> = Result<T, PoolError>;
