//! Configuration errors
//!
//! Raised while building a pool. None of these are recovered locally: a pool
//! that fails to initialize must keep its host task from starting.

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Exactly one of single-node or cluster target must be configured")]
    MissingOrAmbiguousTarget,

    #[error("Invalid pool sizing: {0}")]
    InvalidSizing(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl ConfigError {
    /// Create an invalid sizing error
    #[must_use]
    pub fn sizing(msg: impl std::fmt::Display) -> Self {
        Self::InvalidSizing(msg.to_string())
    }

    /// Create an invalid endpoint error
    #[must_use]
    pub fn endpoint(msg: impl std::fmt::Display) -> Self {
        Self::InvalidEndpoint(msg.to_string())
    }

    /// Get error code for log fields and probe output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingOrAmbiguousTarget => "MISSING_OR_AMBIGUOUS_TARGET",
            Self::InvalidSizing(_) => "INVALID_SIZING",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::MissingVar(_) => "MISSING_VAR",
            Self::InvalidValue(..) => "INVALID_VALUE",
            Self::Load(_) => "CONFIG_LOAD",
        }
    }
}
