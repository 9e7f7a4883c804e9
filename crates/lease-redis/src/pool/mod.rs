//! Redis connection pool module.
//!
//! Provides connection leasing for Redis on top of `lease-core`.

mod connector;
mod redis_pool;

pub use connector::{RedisConnection, RedisConnector};
pub use redis_pool::{RedisLease, RedisPool, RedisPoolError, RedisResult};
