//! Lease manager behavior under concurrency
//!
//! These run against the in-memory connector and need no external services.
//!
//! Run with: cargo test -p integration-tests --test lease_tests

use integration_tests::{mock_pool, wait_for_waiters, MockConnector};
use lease_core::{
    ClusterConfig, ConfigError, LeaseManager, PoolConfig, PoolError, PoolSizing,
    SingleNodeConfig, WaitPolicy,
};
use lease_redis::RedisPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn test_never_exceeds_max_connections() {
    let (connector, stats) = MockConnector::new();
    let sizing = PoolSizing::new(4).with_acquire_timeout(WaitPolicy::Bounded(Duration::from_secs(5)));
    let pool = LeaseManager::new(connector, sizing).unwrap();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let pool = pool.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                for _ in 0..20 {
                    let mut lease = pool.acquire().unwrap();
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    lease.run(Duration::from_millis(1));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    pool.release(lease).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 4);
    assert!(stats.opened() <= 4);
    let status = pool.status();
    assert!(status.size <= 4);
    assert_eq!(status.leased, 0);
    assert_eq!(status.size, status.idle);
}

#[test]
fn test_acquire_release_cycle_is_stable() {
    let (pool, stats) = mock_pool(3, 100);
    let warm: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
    for lease in warm {
        pool.release(lease).unwrap();
    }

    for _ in 0..100 {
        let lease = pool.acquire().unwrap();
        pool.release(lease).unwrap();
    }

    let status = pool.status();
    assert_eq!(status.size, 3);
    assert_eq!(status.idle, 3);
    assert_eq!(stats.opened(), 3);
    assert_eq!(stats.closed(), 0);
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
fn test_third_caller_times_out_then_retry_succeeds() {
    let (pool, _) = mock_pool(2, 100);
    let (tx, rx) = mpsc::channel();

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            let tx = tx.clone();
            thread::spawn(move || tx.send(pool.acquire()).unwrap())
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    drop(tx);

    let results: Vec<_> = rx.iter().collect();
    let mut leases = Vec::new();
    let mut timeouts = 0;
    for result in results {
        match result {
            Ok(lease) => leases.push(lease),
            Err(PoolError::Timeout) => timeouts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(leases.len(), 2);
    assert_eq!(timeouts, 1);

    // Still full until someone gives a connection back
    assert!(matches!(pool.acquire(), Err(PoolError::Timeout)));

    pool.release(leases.pop().unwrap()).unwrap();
    let retry = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire().map(|lease| lease.serial))
    };
    assert!(retry.join().unwrap().is_ok());
}

#[test]
fn test_timeout_is_bounded() {
    let (pool, _) = mock_pool(1, 50);
    let _held = pool.acquire().unwrap();

    let start = Instant::now();
    assert!(matches!(pool.acquire(), Err(PoolError::Timeout)));
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(50));
    assert!(waited < Duration::from_secs(2));
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn test_release_to_wrong_pool_is_rejected() {
    let (home, _) = mock_pool(1, 100);
    let (other, other_stats) = mock_pool(1, 100);

    let lease = home.acquire().unwrap();
    let id = lease.id();
    let result = other.release(lease);
    assert!(matches!(result, Err(PoolError::DoubleRelease(rejected)) if rejected == id));

    assert_eq!(other.status().size, 0);
    assert_eq!(other_stats.opened(), 0);
    assert_eq!(home.status().leased, 0);
}

#[test]
fn test_handoff_release_on_another_thread() {
    let (pool, _) = mock_pool(1, 100);
    let lease = pool.acquire().unwrap();

    let releaser = {
        let pool = pool.clone();
        thread::spawn(move || pool.release(lease))
    };
    releaser.join().unwrap().unwrap();

    assert_eq!(pool.status().idle, 1);
    assert!(pool.acquire().is_ok());
}

#[test]
fn test_connect_failure_does_not_leak_slot() {
    let (pool, _) = mock_pool(1, 0);
    pool.factory().unavailable.store(true, Ordering::SeqCst);
    for _ in 0..5 {
        assert!(matches!(pool.acquire(), Err(PoolError::Connect(_))));
    }
    assert_eq!(pool.status().size, 0);

    pool.factory().unavailable.store(false, Ordering::SeqCst);
    assert!(pool.acquire().is_ok());
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_shutdown_releases_blocked_callers() {
    let (connector, stats) = MockConnector::new();
    let sizing = PoolSizing::new(1).with_acquire_timeout(WaitPolicy::Indefinite);
    let pool = LeaseManager::new(connector, sizing).unwrap();
    let held = pool.acquire().unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire().map(|_| ()))
        })
        .collect();
    wait_for_waiters(&pool, 3);

    let start = Instant::now();
    pool.shutdown();
    for waiter in waiters {
        assert!(matches!(waiter.join().unwrap(), Err(PoolError::Exhausted)));
    }
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(matches!(pool.acquire(), Err(PoolError::Exhausted)));

    pool.release(held).unwrap();
    assert_eq!(pool.status().size, 0);
    assert_eq!(stats.closed(), 1);
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_initialize_rejects_both_targets() {
    let mut config = PoolConfig::single(SingleNodeConfig::new("127.0.0.1:6379"))
        .with_sizing(PoolSizing::new(2).with_min_idle(2));
    config.cluster = Some(ClusterConfig::new(["127.0.0.1:7000", "127.0.0.1:7001"]));

    let result = RedisPool::initialize(config.clone());
    assert!(matches!(result, Err(ConfigError::MissingOrAmbiguousTarget)));

    // Same config through a counting connector: nothing is opened, not even warm-up
    let (connector, stats) = MockConnector::new();
    let result = LeaseManager::from_config(connector, &config);
    assert!(matches!(result, Err(ConfigError::MissingOrAmbiguousTarget)));
    assert_eq!(stats.opened(), 0);
}

#[test]
fn test_initialize_warms_up_valid_target() {
    let config = PoolConfig::single(SingleNodeConfig::new("127.0.0.1:6379"))
        .with_sizing(PoolSizing::new(2).with_min_idle(2));
    let (connector, stats) = MockConnector::new();
    let pool = LeaseManager::from_config(connector, &config).unwrap();
    assert_eq!(stats.opened(), 2);
    assert_eq!(pool.status().idle, 2);
}

#[test]
fn test_initialize_rejects_missing_target() {
    let config = PoolConfig::default().with_sizing(PoolSizing::new(2));
    assert!(matches!(
        RedisPool::initialize(config),
        Err(ConfigError::MissingOrAmbiguousTarget)
    ));
}

// ============================================================================
// Async
// ============================================================================

#[tokio::test]
async fn test_async_acquirers_share_bounded_pool() {
    let (pool, stats) = mock_pool(2, 2_000);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let lease = pool.acquire_async().await?;
                tokio::time::sleep(Duration::from_millis(5)).await;
                pool.release(lease)
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(stats.opened() <= 2);
    assert_eq!(pool.status().leased, 0);
}

#[tokio::test]
async fn test_abandoned_async_acquire_leaves_no_phantom_lease() {
    let (connector, _) = MockConnector::new();
    let sizing = PoolSizing::new(1).with_acquire_timeout(WaitPolicy::Indefinite);
    let pool = LeaseManager::new(connector, sizing).unwrap();
    let held = pool.acquire().unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), pool.acquire_async()).await;
    assert!(abandoned.is_err());

    // The blocking acquire behind the dropped future picks this up and hands it back
    pool.release(held).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let status = pool.status();
        if status.waiting == 0 && status.leased == 0 && status.idle == 1 {
            break;
        }
        assert!(Instant::now() < deadline, "lease never came back: {status:?}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let lease = pool.acquire_async().await.unwrap();
    assert_eq!(pool.status().size, 1);
    pool.release(lease).unwrap();
}
