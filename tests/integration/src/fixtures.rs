//! Test fixtures
//!
//! An in-memory connector that tracks which connections are in use, so tests
//! can catch a connection being handed to two callers at once.

use lease_core::{ConnectionFactory, LeaseManager, PoolSizing, WaitPolicy};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Connection handed out by [`MockConnector`]
#[derive(Debug)]
pub struct MockConnection {
    pub serial: u64,
    in_use: Arc<Mutex<HashSet<u64>>>,
}

impl MockConnection {
    /// Mark the connection busy for the duration of `work`.
    ///
    /// Panics if another caller is already using the same connection.
    pub fn run(&mut self, work: Duration) {
        assert!(
            self.in_use.lock().unwrap().insert(self.serial),
            "connection {} leased to two callers",
            self.serial
        );
        std::thread::sleep(work);
        self.in_use.lock().unwrap().remove(&self.serial);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("mock backend unavailable")]
pub struct MockUnavailable;

/// Shared view of what a [`MockConnector`] has done
#[derive(Debug, Default)]
pub struct MockStats {
    pub opened: AtomicU64,
    pub closed: AtomicUsize,
}

impl MockStats {
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory connection factory
#[derive(Debug, Default)]
pub struct MockConnector {
    pub stats: Arc<MockStats>,
    pub unavailable: AtomicBool,
    in_use: Arc<Mutex<HashSet<u64>>>,
}

impl MockConnector {
    pub fn new() -> (Self, Arc<MockStats>) {
        let connector = Self::default();
        let stats = Arc::clone(&connector.stats);
        (connector, stats)
    }
}

impl ConnectionFactory for MockConnector {
    type Connection = MockConnection;
    type Error = MockUnavailable;

    fn connect(&self) -> Result<MockConnection, MockUnavailable> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MockUnavailable);
        }
        Ok(MockConnection {
            serial: self.stats.opened.fetch_add(1, Ordering::SeqCst) + 1,
            in_use: Arc::clone(&self.in_use),
        })
    }

    fn close(&self, _conn: MockConnection) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pool of `max` mock connections with a bounded wait of `timeout_ms`
pub fn mock_pool(max: usize, timeout_ms: u64) -> (LeaseManager<MockConnector>, Arc<MockStats>) {
    let (connector, stats) = MockConnector::new();
    let sizing = PoolSizing::new(max)
        .with_acquire_timeout(WaitPolicy::Bounded(Duration::from_millis(timeout_ms)));
    let manager = LeaseManager::new(connector, sizing).expect("valid mock sizing");
    (manager, stats)
}
