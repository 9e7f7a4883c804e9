//! Tracing and logging setup
//!
//! Configures the `tracing` subscriber with environment-based filtering.

use crate::config::{LogFormat, LogSettings};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter used when `RUST_LOG` is unset
    pub level: Level,
    /// Enable JSON output format
    pub json: bool,
    /// Include span events (new, close)
    pub span_events: bool,
    /// Include file and line numbers
    pub file_line: bool,
    /// Include thread names
    pub thread_names: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            span_events: false,
            file_line: true,
            thread_names: false,
        }
    }
}

impl TracingConfig {
    /// Create a development configuration with debug logging
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json: false,
            span_events: true,
            file_line: true,
            thread_names: true,
        }
    }

    /// Create a production configuration with JSON logging
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json: true,
            span_events: false,
            file_line: false,
            thread_names: false,
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

impl From<&LogSettings> for TracingConfig {
    fn from(settings: &LogSettings) -> Self {
        let base = match settings.format {
            LogFormat::Json => Self::production(),
            LogFormat::Pretty => Self::default(),
        };
        Self {
            level: settings.level.parse().unwrap_or(base.level),
            // Pool workers are plain threads, so their names matter in the output
            thread_names: true,
            ..base
        }
    }
}

/// Initialize the tracing subscriber with default configuration
///
/// Uses `RUST_LOG` environment variable for filtering if set,
/// otherwise defaults to "info" level.
///
/// # Panics
/// Panics if the subscriber cannot be initialized (usually means it's already set).
pub fn init_tracing() {
    init_tracing_with_config(TracingConfig::default());
}

/// Initialize the tracing subscriber with custom configuration
///
/// # Panics
/// Panics if the subscriber cannot be initialized (usually means it's already set).
pub fn init_tracing_with_config(config: TracingConfig) {
    if let Err(e) = try_init_tracing_with_config(config) {
        panic!("{e}");
    }
}

/// Try to initialize tracing
///
/// Unlike `init_tracing`, a second call does not panic; it returns
/// `TracingError::AlreadyInitialized`.
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

/// Try to initialize tracing with custom configuration
///
/// Returns `TracingError::AlreadyInitialized` if a global subscriber is
/// already set.
pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        // JSON format for production/structured logging
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .with_thread_names(config.thread_names)
                    .with_span_events(config.span_events()),
            )
            .try_init()
    } else {
        // Pretty format for development
        registry
            .with(
                fmt::layer()
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .with_thread_names(config.thread_names)
                    .with_span_events(config.span_events()),
            )
            .try_init()
    };

    result.map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
