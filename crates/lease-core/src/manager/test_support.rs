//! In-memory connection factory for unit tests

use crate::traits::ConnectionFactory;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct FakeConn {
    pub serial: u64,
    pub healthy: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("fake backend refused connection")]
pub(crate) struct FakeRefused;

/// Counts opens and closes so tests can check for leaks
#[derive(Debug, Default)]
pub(crate) struct FakeCounters {
    pub opened: AtomicU64,
    pub closed: AtomicUsize,
}

impl FakeCounters {
    pub fn live(&self) -> u64 {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst) as u64
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeFactory {
    pub counters: Arc<FakeCounters>,
    pub refuse: AtomicBool,
    pub open_unhealthy: AtomicBool,
}

impl FakeFactory {
    pub fn new() -> (Self, Arc<FakeCounters>) {
        let factory = Self::default();
        let counters = Arc::clone(&factory.counters);
        (factory, counters)
    }
}

impl ConnectionFactory for FakeFactory {
    type Connection = FakeConn;
    type Error = FakeRefused;

    fn connect(&self) -> Result<FakeConn, FakeRefused> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(FakeRefused);
        }
        let serial = self.counters.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeConn {
            serial,
            healthy: !self.open_unhealthy.load(Ordering::SeqCst),
        })
    }

    fn is_valid(&self, conn: &mut FakeConn) -> bool {
        conn.healthy
    }

    fn close(&self, _conn: FakeConn) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
