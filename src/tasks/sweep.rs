//! Scheduled Sweeps
//!
//! Background loops driving the expiration engine and the cache purge.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::expiration::ExpirationEngine;
use crate::kv::MemoryKv;

/// Spawns a task running an expiration sweep every `interval_secs` seconds.
///
/// A sweep that cannot even list its candidates is logged and retried on the
/// next tick. The returned handle is aborted on shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(engine, 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(engine: ExpirationEngine, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting expiration sweep task with interval of {} seconds", interval_secs);

        loop {
            tokio::time::sleep(interval).await;

            match engine.process_expirations().await {
                Ok(report) => debug!(?report, "scheduled expiration sweep done"),
                Err(err) => error!(error = %err, "expiration sweep could not list candidates"),
            }
        }
    })
}

/// Spawns a task dropping lapsed entries from the in-memory cache.
pub fn spawn_kv_purge_task(kv: MemoryKv, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = kv.purge_expired().await;
            if removed > 0 {
                info!("KV purge: removed {} expired entries", removed);
            } else {
                debug!("KV purge: no expired entries found");
            }
        }
    })
}
