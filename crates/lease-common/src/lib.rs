//! # lease-common
//!
//! Shared utilities including configuration loading and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{AppConfig, LogFormat, LogSettings, RedisMode, RedisSettings};
pub use lease_core::ConfigError;
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
