//! # lease-redis
//!
//! Redis connection leasing for stream-processing tasks.
//!
//! ## Features
//!
//! - **Connector**: opens single-node or cluster connections behind one
//!   [`RedisConnection`] type
//! - **Pool**: `initialize` / `acquire` / `release` / `shutdown` over the
//!   lease manager from `lease-core`
//!
//! ## Example
//!
//! ```ignore
//! use lease_core::{PoolConfig, SingleNodeConfig};
//! use lease_redis::RedisPool;
//!
//! // Built once when the task starts
//! let pool = RedisPool::initialize(PoolConfig::single(SingleNodeConfig::new("127.0.0.1:6379")))?;
//!
//! // Borrow, use, return
//! let mut lease = pool.acquire()?;
//! let _: () = redis::cmd("SET").arg("key").arg("value").query(&mut *lease)?;
//! pool.release(lease)?;
//!
//! // Torn down with the task
//! pool.shutdown();
//! ```

pub mod pool;

// Re-export pool types
pub use pool::{RedisConnection, RedisConnector, RedisLease, RedisPool, RedisPoolError, RedisResult};
