//! Lease probe
//!
//! Hosts a Redis pool the way a stream-processing task would: initialize on
//! start, lease connections from several worker threads, shut down on exit.
//!
//! Usage: `lease-probe [config-file]`. With a file, `LEASE_*` variables
//! override it (see `AppConfig::load`). Without one, settings come from the
//! `REDIS_*` variables (see `AppConfig::from_env`). `PROBE_WORKERS` and
//! `PROBE_ITERATIONS` size the run.

use anyhow::{anyhow, Context, Result};
use lease_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use lease_redis::{RedisPool, RedisPoolError};
use std::thread;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
struct WorkerReport {
    ok: u64,
    timeouts: u64,
    failed: u64,
}

impl WorkerReport {
    fn merge(self, other: Self) -> Self {
        Self {
            ok: self.ok + other.ok,
            timeouts: self.timeouts + other.timeouts,
            failed: self.failed + other.failed,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn run_worker(pool: &RedisPool, iterations: u64) -> WorkerReport {
    let mut report = WorkerReport::default();
    for _ in 0..iterations {
        match pool.with_connection(|conn| redis::cmd("PING").query::<String>(conn)) {
            Ok(_) => report.ok += 1,
            Err(RedisPoolError::Pool(lease_core::PoolError::Timeout)) => report.timeouts += 1,
            Err(RedisPoolError::Pool(lease_core::PoolError::Exhausted)) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Probe command failed");
                report.failed += 1;
            }
        }
    }
    report
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(Some(&path)),
        None => AppConfig::from_env(),
    }
    .context("Failed to load configuration")?;

    try_init_tracing_with_config(TracingConfig::from(&config.log))?;

    let pool = RedisPool::from_settings(&config.redis).context("Failed to initialize Redis pool")?;

    let workers: usize = env_or("PROBE_WORKERS", config.redis.max_connections * 2);
    let iterations: u64 = env_or("PROBE_ITERATIONS", 100);
    tracing::info!(workers, iterations, "Starting probe");

    let started = Instant::now();
    let handles = (0..workers)
        .map(|i| {
            let pool = pool.clone();
            thread::Builder::new()
                .name(format!("probe-worker-{i}"))
                .spawn(move || run_worker(&pool, iterations))
                .context("Failed to spawn worker thread")
        })
        .collect::<Result<Vec<_>>>()?;

    let mut total = WorkerReport::default();
    for handle in handles {
        let report = handle
            .join()
            .map_err(|_| anyhow!("Probe worker panicked"))?;
        total = total.merge(report);
    }

    let status = pool.status();
    tracing::info!(
        ok = total.ok,
        timeouts = total.timeouts,
        failed = total.failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        open = status.size,
        created = status.created,
        closed = status.closed,
        "Probe finished"
    );

    pool.shutdown();

    if total.failed > 0 {
        return Err(anyhow!("{} probe commands failed", total.failed));
    }
    Ok(())
}
