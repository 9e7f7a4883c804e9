//! Error types for configuration and lease operations

mod config_error;
mod pool_error;

pub use config_error::ConfigError;
pub use pool_error::{BoxError, PoolError, PoolResult};
