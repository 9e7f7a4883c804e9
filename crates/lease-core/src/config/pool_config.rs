//! Pool configuration structs
//!
//! A [`PoolConfig`] names exactly one addressing mode (single node or
//! cluster), optional credentials and the sizing bounds of the pool.

use crate::error::ConfigError;
use std::fmt;
use std::time::{Duration, Instant};

/// Single-node addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleNodeConfig {
    /// Node address as `host:port`
    pub address: String,
    /// Logical database index
    pub database: i64,
}

impl SingleNodeConfig {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            database: 0,
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }
}

/// Cluster addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Seed node addresses as `host:port`
    pub nodes: Vec<String>,
    /// Retries on MOVED/ASK redirections
    pub max_redirections: u32,
}

impl ClusterConfig {
    #[must_use]
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            max_redirections: default_max_redirections(),
        }
    }

    #[must_use]
    pub fn with_max_redirections(mut self, max_redirections: u32) -> Self {
        self.max_redirections = max_redirections;
        self
    }
}

/// Store credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: password.into(),
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How long `acquire` waits when every connection is leased
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait until a connection is released or the pool shuts down
    Indefinite,
    /// Return `Timeout` immediately
    FailFast,
    /// Wait at most this long
    Bounded(Duration),
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Bounded(Duration::from_millis(default_acquire_timeout_ms()))
    }
}

impl WaitPolicy {
    /// Build a policy from a millisecond setting.
    ///
    /// Negative values wait indefinitely, zero fails fast.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms < 0 => Self::Indefinite,
            0 => Self::FailFast,
            ms => Self::Bounded(Duration::from_millis(ms.unsigned_abs())),
        }
    }

    /// Deadline for an acquire starting at `start`, `None` when unbounded
    #[must_use]
    pub fn deadline(self, start: Instant) -> Option<Instant> {
        match self {
            Self::Indefinite => None,
            Self::FailFast => Some(start),
            Self::Bounded(timeout) => start.checked_add(timeout),
        }
    }
}

impl fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indefinite => write!(f, "indefinite"),
            Self::FailFast => write!(f, "fail-fast"),
            Self::Bounded(timeout) => write!(f, "{}ms", timeout.as_millis()),
        }
    }
}

/// Pool sizing bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSizing {
    /// Maximum number of connections, leased plus idle
    pub max_connections: usize,
    /// Maximum number of idle connections kept open
    pub max_idle: usize,
    /// Connections opened eagerly when the pool is built
    pub min_idle: usize,
    /// Wait policy for `acquire`
    pub acquire_timeout: WaitPolicy,
    /// Timeout for opening a backend connection
    pub connect_timeout: Duration,
    /// Validate idle connections before lending them out
    pub test_on_checkout: bool,
}

impl Default for PoolSizing {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_idle: default_max_connections(),
            min_idle: 0,
            acquire_timeout: WaitPolicy::default(),
            connect_timeout: Duration::from_millis(default_connect_timeout_ms()),
            test_on_checkout: false,
        }
    }
}

impl PoolSizing {
    /// Sizing with `max_connections` and a matching idle cap
    #[must_use]
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            max_idle: max_connections,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    #[must_use]
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, policy: WaitPolicy) -> Self {
        self.acquire_timeout = policy;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_test_on_checkout(mut self, enabled: bool) -> Self {
        self.test_on_checkout = enabled;
        self
    }

    /// Check the bounds are consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::sizing("max_connections must be at least 1"));
        }
        if self.min_idle > self.max_idle {
            return Err(ConfigError::sizing(format!(
                "min_idle ({}) exceeds max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        if self.min_idle > self.max_connections {
            return Err(ConfigError::sizing(format!(
                "min_idle ({}) exceeds max_connections ({})",
                self.min_idle, self.max_connections
            )));
        }
        Ok(())
    }
}

/// Resolved addressing mode of a [`PoolConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Single(&'a SingleNodeConfig),
    Cluster(&'a ClusterConfig),
}

/// Connection pool configuration
///
/// Exactly one of `single` and `cluster` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConfig {
    pub single: Option<SingleNodeConfig>,
    pub cluster: Option<ClusterConfig>,
    pub credentials: Option<Credentials>,
    pub sizing: PoolSizing,
}

impl PoolConfig {
    /// Config targeting a single node
    #[must_use]
    pub fn single(node: SingleNodeConfig) -> Self {
        Self {
            single: Some(node),
            ..Default::default()
        }
    }

    /// Config targeting a cluster
    #[must_use]
    pub fn cluster(cluster: ClusterConfig) -> Self {
        Self {
            cluster: Some(cluster),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_sizing(mut self, sizing: PoolSizing) -> Self {
        self.sizing = sizing;
        self
    }

    /// Resolve the addressing mode
    pub fn target(&self) -> Result<Target<'_>, ConfigError> {
        match (&self.single, &self.cluster) {
            (Some(single), None) => Ok(Target::Single(single)),
            (None, Some(cluster)) if !cluster.nodes.is_empty() => Ok(Target::Cluster(cluster)),
            _ => Err(ConfigError::MissingOrAmbiguousTarget),
        }
    }

    /// Validate addressing, endpoints and sizing, returning the resolved target
    pub fn validate(&self) -> Result<Target<'_>, ConfigError> {
        let target = self.target()?;
        match target {
            Target::Single(single) => validate_address(&single.address)?,
            Target::Cluster(cluster) => {
                for node in &cluster.nodes {
                    validate_address(node)?;
                }
            }
        }
        self.sizing.validate()?;
        Ok(target)
    }
}

/// Check an address has the form `host:port`
fn validate_address(address: &str) -> Result<(), ConfigError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::endpoint(format!("{address} (expected host:port)")))?;
    if host.is_empty() {
        return Err(ConfigError::endpoint(format!("{address} (empty host)")));
    }
    port.parse::<u16>()
        .map_err(|_| ConfigError::endpoint(format!("{address} (invalid port)")))?;
    Ok(())
}

// Default value functions
fn default_max_connections() -> usize {
    8
}

fn default_acquire_timeout_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_max_redirections() -> u32 {
    5
}
