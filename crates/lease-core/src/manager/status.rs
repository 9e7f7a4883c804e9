//! Pool status snapshot

/// Point-in-time view of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatus {
    /// Configured connection bound
    pub max_size: usize,
    /// Open connections, leased plus idle
    pub size: usize,
    /// Connections sitting in the idle set
    pub idle: usize,
    /// Connections currently leased
    pub leased: usize,
    /// Callers blocked in `acquire`
    pub waiting: usize,
    /// Connections opened since the pool was built
    pub created: u64,
    /// Connections closed since the pool was built
    pub closed: u64,
    /// Acquires that ended in `Timeout`
    pub timeouts: u64,
}

impl PoolStatus {
    /// Number of acquires that could succeed right now without waiting
    #[must_use]
    pub fn available(&self) -> usize {
        self.idle + self.max_size.saturating_sub(self.size)
    }
}
