//! Leased connection handle

use super::lease_manager::Shared;
use crate::traits::ConnectionFactory;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifier of one lease, unique within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(u64);

impl LeaseId {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Exclusive hold on one pooled connection
///
/// Dereferences to the backend connection. Hand it back with
/// [`LeaseManager::release`](super::LeaseManager::release); a lease that is
/// dropped instead goes back to its pool on its own. A lease keeps its pool
/// alive, so the connection is always closed through the pool's factory.
pub struct Lease<F: ConnectionFactory> {
    id: LeaseId,
    conn: Option<F::Connection>,
    broken: bool,
    leased_at: Instant,
    pool: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> Lease<F> {
    pub(crate) fn new(id: LeaseId, conn: F::Connection, pool: &Arc<Shared<F>>) -> Self {
        Self {
            id,
            conn: Some(conn),
            broken: false,
            leased_at: Instant::now(),
            pool: Arc::clone(pool),
        }
    }

    #[must_use]
    pub fn id(&self) -> LeaseId {
        self.id
    }

    /// How long this lease has been held
    #[must_use]
    pub fn held_for(&self) -> Duration {
        self.leased_at.elapsed()
    }

    /// Flag the connection as unusable so it is evicted on release
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub(crate) fn issued_by(&self, pool: &Arc<Shared<F>>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }

    /// Take the connection out for check-in, leaving the drop guard disarmed
    pub(crate) fn take(&mut self) -> Option<F::Connection> {
        self.conn.take()
    }
}

impl<F: ConnectionFactory> Deref for Lease<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("lease used after its connection was returned")
    }
}

impl<F: ConnectionFactory> DerefMut for Lease<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("lease used after its connection was returned")
    }
}

impl<F: ConnectionFactory> Drop for Lease<F> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        tracing::debug!(lease_id = %self.id, "Lease dropped without release, returning connection");
        if let Err(e) = self.pool.check_in(self.id, conn, self.broken) {
            tracing::warn!(lease_id = %self.id, error = %e, "Dropped lease could not be returned");
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for Lease<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("broken", &self.broken)
            .field("held_for", &self.held_for())
            .finish()
    }
}
