//! Connection lease manager
//!
//! Owns the idle set and the outstanding lease ids of one pool.

mod lease;
mod lease_manager;
mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use lease::{Lease, LeaseId};
pub use lease_manager::LeaseManager;
pub use status::PoolStatus;
