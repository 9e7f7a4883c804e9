//! # lease-core
//!
//! Bounded connection pool with explicit lease bookkeeping.
//!
//! ## Features
//!
//! - **Lease Manager**: blocking `acquire` with an explicit wait policy, `release`
//!   with double-release detection, idempotent `shutdown`
//! - **Pool Config**: single-node or cluster addressing, validated at construction
//! - **Connection Factory**: capability trait the manager uses to open, validate
//!   and close backend connections
//!
//! ## Example
//!
//! ```ignore
//! use lease_core::{LeaseManager, PoolSizing};
//!
//! let manager = LeaseManager::new(factory, PoolSizing::default())?;
//!
//! let mut lease = manager.acquire()?;
//! // use `*lease` as the backend connection
//! manager.release(lease)?;
//!
//! manager.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ClusterConfig, Credentials, PoolConfig, PoolSizing, SingleNodeConfig, Target, WaitPolicy};
pub use error::{BoxError, ConfigError, PoolError, PoolResult};
pub use manager::{Lease, LeaseId, LeaseManager, PoolStatus};
pub use traits::ConnectionFactory;
