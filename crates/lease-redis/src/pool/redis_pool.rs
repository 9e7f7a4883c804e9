//! Redis lease pool.
//!
//! The handle a host task keeps for its lifetime: built once with
//! [`RedisPool::initialize`] when the task starts, torn down with
//! [`RedisPool::shutdown`] when it stops.

use super::connector::{RedisConnection, RedisConnector};
use lease_common::RedisSettings;
use lease_core::{ConfigError, Lease, LeaseManager, PoolConfig, PoolError, PoolResult, PoolStatus};

/// A leased Redis connection
pub type RedisLease = Lease<RedisConnector>;

/// Error type for Redis pool operations
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for Redis pool operations
pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    manager: LeaseManager<RedisConnector>,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("target", &self.manager.factory().description())
            .field("status", &self.manager.status())
            .finish()
    }
}

impl RedisPool {
    /// Create a new Redis pool with the given configuration.
    ///
    /// Fails without opening any connection when the config names no target,
    /// or both a single node and a cluster.
    pub fn initialize(config: PoolConfig) -> Result<Self, ConfigError> {
        let connector = RedisConnector::from_config(&config)?;
        let manager = LeaseManager::from_config(connector, &config)?;

        tracing::info!(
            target_node = %manager.factory().description(),
            max_connections = manager.sizing().max_connections,
            "Redis pool initialized"
        );

        Ok(Self { manager })
    }

    /// Create a new Redis pool from lease-common settings
    pub fn from_settings(settings: &RedisSettings) -> Result<Self, ConfigError> {
        Self::initialize(PoolConfig::from(settings))
    }

    /// Borrow a connection
    pub fn acquire(&self) -> PoolResult<RedisLease> {
        self.manager.acquire()
    }

    /// Borrow a connection from async code
    pub async fn acquire_async(&self) -> PoolResult<RedisLease> {
        self.manager.acquire_async().await
    }

    /// Return a borrowed connection
    pub fn release(&self, lease: RedisLease) -> PoolResult<()> {
        self.manager.release(lease)
    }

    /// Run Redis commands on a leased connection.
    ///
    /// A connection that fails with an I/O or dropped-connection error is
    /// evicted instead of going back to the idle set. The command error is
    /// returned either way; retrying is up to the caller.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut RedisConnection) -> redis::RedisResult<T>,
    ) -> RedisResult<T> {
        let mut lease = self.acquire()?;
        let result = f(&mut lease);
        if let Err(e) = &result {
            if e.is_io_error() || e.is_connection_dropped() {
                tracing::debug!(lease_id = %lease.id(), error = %e, "Evicting broken Redis connection");
                lease.mark_broken();
            }
        }
        self.release(lease)?;
        Ok(result?)
    }

    /// Check if the pool is healthy by pinging Redis
    pub fn health_check(&self) -> RedisResult<()> {
        self.with_connection(RedisConnection::ping)
    }

    /// Close all connections and refuse further acquires
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.manager.is_shut_down()
    }

    /// Get the current pool status
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.manager.status()
    }

    /// Underlying lease manager
    #[must_use]
    pub fn manager(&self) -> &LeaseManager<RedisConnector> {
        &self.manager
    }
}
