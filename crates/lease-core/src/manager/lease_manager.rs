//! Lease manager
//!
//! All bookkeeping lives behind one `parking_lot` mutex: the idle set, the ids
//! of outstanding leases and the open-connection count. A condvar wakes
//! callers blocked in `acquire` when a connection comes back, a slot frees up
//! or the pool shuts down. Backend I/O (connect, validate, close) always runs
//! with the lock released.

use super::lease::{Lease, LeaseId};
use super::status::PoolStatus;
use crate::config::{PoolConfig, PoolSizing};
use crate::error::{ConfigError, PoolError, PoolResult};
use crate::traits::ConnectionFactory;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Mutable pool bookkeeping
struct PoolState<C> {
    idle: VecDeque<C>,
    leased: HashSet<LeaseId>,
    /// Open connections, `idle.len() + leased.len()`
    size: usize,
    waiting: usize,
    next_id: u64,
    shut_down: bool,
}

impl<C> PoolState<C> {
    fn new() -> Self {
        Self {
            idle: VecDeque::new(),
            leased: HashSet::new(),
            size: 0,
            waiting: 0,
            next_id: 0,
            shut_down: false,
        }
    }

    /// Record a new outstanding lease
    fn check_out(&mut self) -> LeaseId {
        self.next_id += 1;
        let id = LeaseId::new(self.next_id);
        self.leased.insert(id);
        id
    }
}

/// State shared between the manager handles and their leases
pub(crate) struct Shared<F: ConnectionFactory> {
    factory: F,
    sizing: PoolSizing,
    state: Mutex<PoolState<F::Connection>>,
    available: Condvar,
    created: AtomicU64,
    closed: AtomicU64,
    timeouts: AtomicU64,
}

impl<F: ConnectionFactory> Shared<F> {
    /// Take a leased connection back
    pub(crate) fn check_in(&self, id: LeaseId, conn: F::Connection, broken: bool) -> PoolResult<()> {
        let mut state = self.state.lock();
        if !state.leased.remove(&id) {
            drop(state);
            tracing::warn!(lease_id = %id, "Rejected release of a lease that is not checked out");
            return Err(PoolError::DoubleRelease(id));
        }

        let reason = if broken {
            Some("broken")
        } else if state.shut_down {
            Some("pool shut down")
        } else if state.idle.len() >= self.sizing.max_idle {
            Some("idle set full")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                state.size -= 1;
                drop(state);
                // A freed slot lets a waiter open a fresh connection.
                self.available.notify_one();
                tracing::debug!(lease_id = %id, reason, "Closing returned connection");
                self.close(conn);
            }
            None => {
                state.idle.push_back(conn);
                drop(state);
                self.available.notify_one();
            }
        }
        Ok(())
    }

    fn close(&self, conn: F::Connection) {
        self.factory.close(conn);
        self.closed.fetch_add(1, Ordering::Relaxed);
    }
}

impl<F: ConnectionFactory> Drop for Shared<F> {
    fn drop(&mut self) {
        let idle: Vec<_> = self.state.get_mut().idle.drain(..).collect();
        for conn in idle {
            self.close(conn);
        }
    }
}

/// Bounded pool of connections lent out one lease at a time
///
/// Cloning is cheap and every clone manages the same pool.
pub struct LeaseManager<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> Clone for LeaseManager<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for LeaseManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseManager")
            .field("status", &self.status())
            .finish()
    }
}

impl<F: ConnectionFactory> LeaseManager<F> {
    /// Build a pool over `factory`.
    ///
    /// Opens `min_idle` connections up front. A warm-up connection that fails
    /// to open is logged and the pool falls back to opening on demand.
    pub fn new(factory: F, sizing: PoolSizing) -> Result<Self, ConfigError> {
        sizing.validate()?;

        let mut state = PoolState::new();
        let mut created = 0;
        for _ in 0..sizing.min_idle {
            match factory.connect() {
                Ok(conn) => {
                    state.idle.push_back(conn);
                    state.size += 1;
                    created += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        opened = created,
                        min_idle = sizing.min_idle,
                        "Warm-up connection failed, falling back to lazy creation"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            max_connections = sizing.max_connections,
            max_idle = sizing.max_idle,
            warm = created,
            acquire_timeout = %sizing.acquire_timeout,
            "Lease manager created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                factory,
                sizing,
                state: Mutex::new(state),
                available: Condvar::new(),
                created: AtomicU64::new(created),
                closed: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
            }),
        })
    }

    /// Build a pool for the backend addressed by `config`.
    ///
    /// The addressing and sizing are checked before `factory` is asked for
    /// any connection, so a rejected config opens nothing.
    pub fn from_config(factory: F, config: &PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(factory, config.sizing.clone())
    }

    /// Borrow a connection, blocking according to the wait policy.
    ///
    /// Idle connections are reused first; below the bound a new one is
    /// opened; otherwise the caller waits for a release.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the wait policy elapses first
    /// - `Exhausted` if the pool is or becomes shut down
    /// - `Connect` if opening a new connection fails
    pub fn acquire(&self) -> PoolResult<Lease<F>> {
        let shared = &self.shared;
        let deadline = shared.sizing.acquire_timeout.deadline(Instant::now());
        let mut state = shared.state.lock();

        loop {
            if state.shut_down {
                return Err(PoolError::Exhausted);
            }

            if let Some(mut conn) = state.idle.pop_front() {
                let id = state.check_out();
                if shared.sizing.test_on_checkout
                    && !MutexGuard::unlocked(&mut state, || shared.factory.is_valid(&mut conn))
                {
                    state.leased.remove(&id);
                    state.size -= 1;
                    tracing::debug!(lease_id = %id, "Evicting idle connection that failed validation");
                    MutexGuard::unlocked(&mut state, || shared.close(conn));
                    continue;
                }
                return Ok(Lease::new(id, conn, shared));
            }

            if state.size < shared.sizing.max_connections {
                state.size += 1;
                let id = state.check_out();
                match MutexGuard::unlocked(&mut state, || shared.factory.connect()) {
                    Ok(conn) => {
                        shared.created.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(lease_id = %id, size = state.size, "Opened pooled connection");
                        return Ok(Lease::new(id, conn, shared));
                    }
                    Err(e) => {
                        state.leased.remove(&id);
                        state.size -= 1;
                        drop(state);
                        shared.available.notify_one();
                        return Err(PoolError::Connect(Box::new(e)));
                    }
                }
            }

            match deadline {
                None => {
                    state.waiting += 1;
                    shared.available.wait(&mut state);
                    state.waiting -= 1;
                }
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        drop(state);
                        shared.timeouts.fetch_add(1, Ordering::Relaxed);
                        return Err(PoolError::Timeout);
                    }
                    state.waiting += 1;
                    shared.available.wait_until(&mut state, deadline);
                    state.waiting -= 1;
                }
            }
        }
    }

    /// Borrow a connection from async code.
    ///
    /// The blocking wait runs on the tokio blocking pool. If the returned
    /// future is dropped early, a lease obtained in the meantime is returned
    /// to the pool when the blocking task finishes.
    pub async fn acquire_async(&self) -> PoolResult<Lease<F>> {
        let manager = self.clone();
        match tokio::task::spawn_blocking(move || manager.acquire()).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Cancelled only when the runtime itself is shutting down
            Err(_) => Err(PoolError::Exhausted),
        }
    }

    /// Give a leased connection back.
    ///
    /// A lease flagged with [`Lease::mark_broken`] is closed instead of
    /// re-idled, as is any connection returned after shutdown or while the
    /// idle set is full.
    ///
    /// # Errors
    ///
    /// `DoubleRelease` if the lease is not outstanding in this pool. Pool
    /// state is left untouched in that case.
    pub fn release(&self, mut lease: Lease<F>) -> PoolResult<()> {
        let id = lease.id();
        if !lease.issued_by(&self.shared) {
            tracing::warn!(lease_id = %id, "Rejected release of a lease issued by another pool");
            return Err(PoolError::DoubleRelease(id));
        }
        let Some(conn) = lease.take() else {
            return Err(PoolError::DoubleRelease(id));
        };
        self.shared.check_in(id, conn, lease.is_broken())
    }

    /// Run `f` on a leased connection and release it afterwards
    pub fn with_lease<T>(&self, f: impl FnOnce(&mut F::Connection) -> T) -> PoolResult<T> {
        let mut lease = self.acquire()?;
        let out = f(&mut lease);
        self.release(lease)?;
        Ok(out)
    }

    /// Close every idle connection and refuse further acquires.
    ///
    /// Callers blocked in `acquire` wake up with `Exhausted`. Connections
    /// still leased are closed as they come back. Calling this again is a
    /// no-op.
    pub fn shutdown(&self) {
        let drained: Vec<_> = {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                tracing::debug!("Lease manager already shut down");
                return;
            }
            state.shut_down = true;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.size -= drained.len();
            tracing::info!(
                closed_idle = drained.len(),
                still_leased = state.leased.len(),
                waiting = state.waiting,
                "Lease manager shutting down"
            );
            drained
        };
        self.shared.available.notify_all();

        for conn in drained {
            self.shared.close(conn);
        }
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    /// Get the current pool status
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus {
            max_size: self.shared.sizing.max_connections,
            size: state.size,
            idle: state.idle.len(),
            leased: state.leased.len(),
            waiting: state.waiting,
            created: self.shared.created.load(Ordering::Relaxed),
            closed: self.shared.closed.load(Ordering::Relaxed),
            timeouts: self.shared.timeouts.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn sizing(&self) -> &PoolSizing {
        &self.shared.sizing
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }
}
