//! Connection factory trait
//!
//! The lease manager never talks to a backend directly. It asks a factory to
//! open, validate and close connections, and only keeps the bookkeeping.

/// Opens, validates and closes backend connections for a lease manager
///
/// Implementations are shared across every thread that acquires from the
/// pool, so they must be `Send + Sync`. All methods are called without the
/// pool lock held.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Connection handed out to lease holders
    type Connection: Send + 'static;

    /// Error returned when a connection cannot be opened
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection
    fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Check an idle connection before lending it out.
    ///
    /// Only called when `test_on_checkout` is enabled.
    fn is_valid(&self, _conn: &mut Self::Connection) -> bool {
        true
    }

    /// Close a connection that is leaving the pool.
    ///
    /// Called once for every connection the factory opened, including those
    /// still idle or leased when the last pool handle goes away.
    fn close(&self, conn: Self::Connection) {
        drop(conn);
    }
}
