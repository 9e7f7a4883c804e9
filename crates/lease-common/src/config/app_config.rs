//! Application configuration structs
//!
//! Loads configuration from environment variables or a config file.

use lease_core::{
    ClusterConfig, ConfigError, Credentials, PoolConfig, PoolSizing, SingleNodeConfig, WaitPolicy,
};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub redis: RedisSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Redis addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    #[default]
    Single,
    Cluster,
}

impl FromStr for RedisMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "cluster" => Ok(Self::Cluster),
            _ => Err(ConfigError::InvalidValue("REDIS_MODE", s.to_string())),
        }
    }
}

/// Redis pool settings
#[derive(Clone, Deserialize)]
pub struct RedisSettings {
    #[serde(default)]
    pub mode: RedisMode,
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub database: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,
    #[serde(default)]
    pub min_idle: usize,
    /// Negative waits indefinitely, zero fails fast
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: i64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_max_redirections")]
    pub max_redirections: u32,
    #[serde(default)]
    pub test_on_checkout: bool,
}

impl std::fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSettings")
            .field("mode", &self.mode)
            .field("endpoints", &self.endpoints)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("max_idle", &self.max_idle)
            .field("min_idle", &self.min_idle)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

impl From<&RedisSettings> for PoolConfig {
    /// Single mode with several endpoints fills both addressing sections, so
    /// the pool rejects it as ambiguous instead of silently picking one.
    fn from(settings: &RedisSettings) -> Self {
        let mut config = PoolConfig::default();
        match settings.mode {
            RedisMode::Single => {
                if let Some(first) = settings.endpoints.first() {
                    config.single =
                        Some(SingleNodeConfig::new(first.clone()).with_database(settings.database));
                }
                if settings.endpoints.len() > 1 {
                    config.cluster = Some(ClusterConfig::new(settings.endpoints.clone()));
                }
            }
            RedisMode::Cluster => {
                if !settings.endpoints.is_empty() {
                    config.cluster = Some(
                        ClusterConfig::new(settings.endpoints.clone())
                            .with_max_redirections(settings.max_redirections),
                    );
                }
            }
        }

        config.credentials = settings.password.as_ref().map(|password| {
            let credentials = Credentials::password(password.clone());
            match &settings.username {
                Some(username) => credentials.with_username(username.clone()),
                None => credentials,
            }
        });

        config.sizing = PoolSizing {
            max_connections: settings.max_connections,
            max_idle: settings.max_idle,
            min_idle: settings.min_idle,
            acquire_timeout: WaitPolicy::from_millis(settings.acquire_timeout_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            test_on_checkout: settings.test_on_checkout,
        };
        config
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue("LOG_FORMAT", s.to_string())),
        }
    }
}

impl TryFrom<String> for LogFormat {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_max_connections() -> usize {
    8
}

fn default_max_idle() -> usize {
    8
}

fn default_acquire_timeout_ms() -> i64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_max_redirections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw.clone())),
        Err(_) => Ok(default),
    }
}

/// Environment layer for [`AppConfig::load`]
fn env_overrides() -> ::config::Environment {
    ::config::Environment::with_prefix("LEASE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("redis.endpoints")
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `REDIS_ENDPOINTS` is missing or a variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mode = match env::var("REDIS_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => RedisMode::default(),
        };

        let endpoints = env::var("REDIS_ENDPOINTS")
            .map_err(|_| ConfigError::MissingVar("REDIS_ENDPOINTS"))?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            redis: RedisSettings {
                mode,
                endpoints,
                database: parse_var("REDIS_DATABASE", 0)?,
                username: env::var("REDIS_USERNAME").ok(),
                password: env::var("REDIS_PASSWORD").ok(),
                max_connections: parse_var("REDIS_MAX_CONNECTIONS", default_max_connections())?,
                max_idle: parse_var("REDIS_MAX_IDLE", default_max_idle())?,
                min_idle: parse_var("REDIS_MIN_IDLE", 0)?,
                acquire_timeout_ms: parse_var(
                    "REDIS_ACQUIRE_TIMEOUT_MS",
                    default_acquire_timeout_ms(),
                )?,
                connect_timeout_ms: parse_var(
                    "REDIS_CONNECT_TIMEOUT_MS",
                    default_connect_timeout_ms(),
                )?,
                max_redirections: parse_var("REDIS_MAX_REDIRECTIONS", default_max_redirections())?,
                test_on_checkout: parse_var("REDIS_TEST_ON_CHECKOUT", false)?,
            },
            log: LogSettings {
                format: parse_var("LOG_FORMAT", LogFormat::default())?,
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            },
        })
    }

    /// Load layered configuration: an optional file, then the environment.
    ///
    /// The file (TOML, YAML or JSON, picked by extension) is skipped when it
    /// does not exist. Variables prefixed `LEASE_` override it, with `__`
    /// between nesting levels: `LEASE_REDIS__MAX_CONNECTIONS=16`,
    /// `LEASE_LOG__FORMAT=json`. `LEASE_REDIS__ENDPOINTS` takes a
    /// comma-separated list.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load_layered(path, env_overrides())
    }

    fn load_layered(path: Option<&str>, env: ::config::Environment) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }
        builder
            .add_source(env)
            .build()
            .and_then(|loaded| loaded.try_deserialize::<Self>())
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Pool configuration derived from the Redis settings
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::from(&self.redis)
    }
}
