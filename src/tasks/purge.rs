//! Purge Task
//!
//! Background task that periodically sweeps expired entries out of a driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::Driver;

/// Spawns a background task that calls [`Driver::purge`] every interval.
///
/// Purge is synchronous and may touch the disk, so each sweep runs on the
/// blocking pool.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let driver: Arc<dyn Driver> = Arc::new(MemoryDriver::new(&options, clock)?);
/// let purge_handle = spawn_purge_task(driver.clone(), 60);
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task(driver: Arc<dyn Driver>, purge_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(purge_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting purge task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let sweep = {
                let driver = driver.clone();
                tokio::task::spawn_blocking(move || driver.purge())
            };

            match sweep.await {
                Ok(true) => debug!("Purge sweep complete for {} driver", driver.kind()),
                Ok(false) => warn!("Purge sweep reported failure for {} driver", driver.kind()),
                Err(e) => warn!("Purge sweep panicked: {}", e),
            }
        }
    })
}
