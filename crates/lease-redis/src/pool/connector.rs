//! Redis connection factory.
//!
//! One connector type covers both addressing modes; the mode is picked once
//! from the [`PoolConfig`] and dispatched on with an enum.

use lease_core::{ConfigError, ConnectionFactory, Credentials, PoolConfig, Target};
use redis::cluster::{ClusterClient, ClusterConnection};
use redis::{Cmd, ConnectionLike, IntoConnectionInfo, RedisResult, Value};
use std::fmt;
use std::time::Duration;

/// A live Redis session, single-node or cluster
///
/// Implements [`ConnectionLike`], so commands run the same way in both modes:
/// `redis::cmd("GET").arg(key).query(&mut conn)`.
pub enum RedisConnection {
    Single(redis::Connection),
    Cluster(ClusterConnection),
}

impl RedisConnection {
    #[must_use]
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }

    /// Round-trip a `PING`
    pub fn ping(&mut self) -> RedisResult<()> {
        redis::cmd("PING").query::<String>(self)?;
        Ok(())
    }
}

impl ConnectionLike for RedisConnection {
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value> {
        match self {
            Self::Single(conn) => conn.req_packed_command(cmd),
            Self::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>> {
        match self {
            Self::Single(conn) => conn.req_packed_commands(cmd, offset, count),
            Self::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    // Cluster connections route by command, so keep their own implementation
    fn req_command(&mut self, cmd: &Cmd) -> RedisResult<Value> {
        match self {
            Self::Single(conn) => conn.req_command(cmd),
            Self::Cluster(conn) => conn.req_command(cmd),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            Self::Single(conn) => conn.get_db(),
            Self::Cluster(conn) => conn.get_db(),
        }
    }

    fn check_connection(&mut self) -> bool {
        match self {
            Self::Single(conn) => conn.check_connection(),
            Self::Cluster(conn) => conn.check_connection(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Single(conn) => conn.is_open(),
            Self::Cluster(conn) => conn.is_open(),
        }
    }
}

impl fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(conn) => f
                .debug_struct("RedisConnection::Single")
                .field("db", &conn.get_db())
                .finish(),
            Self::Cluster(_) => f.debug_struct("RedisConnection::Cluster").finish(),
        }
    }
}

enum Backend {
    Single(redis::Client),
    Cluster(ClusterClient),
}

/// Opens Redis connections for the lease manager
pub struct RedisConnector {
    backend: Backend,
    connect_timeout: Duration,
    /// Target without credentials, for logs
    description: String,
}

impl RedisConnector {
    /// Build a connector for the configured target.
    ///
    /// No connection is opened here.
    pub fn from_config(config: &PoolConfig) -> Result<Self, ConfigError> {
        let target = config.validate()?;
        let connect_timeout = config.sizing.connect_timeout;

        let (backend, description) = match target {
            Target::Single(node) => {
                let mut info = format!("redis://{}/{}", node.address, node.database)
                    .into_connection_info()
                    .map_err(|e| ConfigError::endpoint(format!("{}: {e}", node.address)))?;
                if let Some(credentials) = &config.credentials {
                    info.redis.username.clone_from(&credentials.username);
                    info.redis.password = Some(credentials.password.clone());
                }
                let client = redis::Client::open(info)
                    .map_err(|e| ConfigError::endpoint(format!("{}: {e}", node.address)))?;
                (
                    Backend::Single(client),
                    format!("single {}/{}", node.address, node.database),
                )
            }
            Target::Cluster(cluster) => {
                let nodes: Vec<String> = cluster
                    .nodes
                    .iter()
                    .map(|node| format!("redis://{node}"))
                    .collect();
                let mut builder = ClusterClient::builder(nodes)
                    .retries(cluster.max_redirections)
                    .connection_timeout(connect_timeout);
                if let Some(Credentials { username, password }) = &config.credentials {
                    builder = builder.password(password.clone());
                    if let Some(username) = username {
                        builder = builder.username(username.clone());
                    }
                }
                let client = builder
                    .build()
                    .map_err(|e| ConfigError::endpoint(format!("cluster: {e}")))?;
                (
                    Backend::Cluster(client),
                    format!("cluster [{}]", cluster.nodes.join(", ")),
                )
            }
        };

        Ok(Self {
            backend,
            connect_timeout,
            description,
        })
    }

    /// Target description with credentials left out
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn is_cluster(&self) -> bool {
        matches!(self.backend, Backend::Cluster(_))
    }

    /// Timeout applied when opening a connection, in either mode
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl fmt::Debug for RedisConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnector")
            .field("target", &self.description)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ConnectionFactory for RedisConnector {
    type Connection = RedisConnection;
    type Error = redis::RedisError;

    fn connect(&self) -> RedisResult<RedisConnection> {
        match &self.backend {
            Backend::Single(client) => client
                .get_connection_with_timeout(self.connect_timeout)
                .map(RedisConnection::Single),
            Backend::Cluster(client) => client.get_connection().map(RedisConnection::Cluster),
        }
    }

    fn is_valid(&self, conn: &mut RedisConnection) -> bool {
        conn.is_open() && conn.ping().is_ok()
    }
}
