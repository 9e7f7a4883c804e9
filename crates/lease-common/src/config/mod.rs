//! Configuration structs

mod app_config;

pub use app_config::{AppConfig, LogFormat, LogSettings, RedisMode, RedisSettings};
